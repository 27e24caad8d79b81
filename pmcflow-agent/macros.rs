//! Declarative macros shared across the pmcflow codebase

/// Define an enum with name() and all() methods, plus custom data per variant
///
/// # Example
/// ```
/// use pmcflow::enum_with_data;
///
/// enum_with_data! {
///     pub enum LookupState: u8 {
///         Modified => ("M", 0x01),
///         Shared => ("S", 0x06),
///         Invalid => ("I", 0x08),
///     }
///     impl umask -> u8
/// }
///
/// let state = LookupState::Invalid;
/// assert_eq!(state.name(), "I");
/// assert_eq!(state.umask(), 0x08);
/// assert_eq!(LookupState::all().len(), 3);
/// ```
#[macro_export]
macro_rules! enum_with_data {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $data_type:ty {
            $($variant:ident => ($str:literal, $data:expr)),* $(,)?
        }
        impl $method:ident -> $return_type:ty
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }

            pub fn $method(&self) -> $return_type {
                match self {
                    $($name::$variant => $data,)*
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant,)*]
            }
        }
    };
}
