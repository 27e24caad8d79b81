//! Generic register abstractions for type-safe MSR programming

/// Trait for register layouts that can be converted to/from raw MSR values
///
/// This trait provides type-safe conversion between structured register
/// layouts and the raw 64-bit values that are written to/read from MSRs.
///
/// # Example
///
/// ```ignore
/// use pmcflow_raw::register::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct MyControl {
///     enable: bool,
///     threshold: u8,
/// }
///
/// impl RegisterLayout for MyControl {
///     fn to_msr_value(&self) -> u64 {
///         (if self.enable { 1 } else { 0 })
///             | ((self.threshold as u64) << 8)
///     }
///
///     fn from_msr_value(value: u64) -> Self {
///         Self {
///             enable: (value & 1) != 0,
///             threshold: ((value >> 8) & 0xFF) as u8,
///         }
///     }
/// }
/// ```
pub trait RegisterLayout: Sized {
    /// Convert this register layout to a raw MSR value
    fn to_msr_value(&self) -> u64;

    /// Parse a raw MSR value into this register layout
    fn from_msr_value(value: u64) -> Self;

    /// Validate that the register values are within acceptable ranges
    ///
    /// Returns `Ok(())` if valid, or an error message if invalid.
    fn validate(&self) -> Result<(), &'static str> {
        Ok(())
    }
}

/// Address of one register slot replicated across a bank of identical units
///
/// Uncore boxes expose the same register set at a fixed distance from each
/// other, so the address of slot `s` in unit `i` is `base + stride * i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterAddress {
    /// Address of the register in unit 0
    pub base: u64,
    /// Distance between the same register in consecutive units
    pub stride: u64,
}

impl RegisterAddress {
    pub const fn new(base: u64, stride: u64) -> Self {
        Self { base, stride }
    }

    /// MSR address of this register in unit `unit`
    pub const fn for_unit(&self, unit: usize) -> u64 {
        self.base + self.stride * unit as u64
    }
}

/// A hardware register with address and typed layout
///
/// # Example
///
/// ```ignore
/// use pmcflow_raw::register::Register;
///
/// let reg = Register::new(0x2000, UncorePerfEvtSel {
///     event_select: 0x34,
///     enable: true,
///     ..Default::default()
/// });
///
/// port.write(reg.address, reg.to_msr_value())?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Register<T: RegisterLayout> {
    /// MSR address
    pub address: u64,
    /// Typed register layout
    pub layout: T,
}

impl<T: RegisterLayout> Register<T> {
    /// Create a new register with the given address and layout
    pub fn new(address: u64, layout: T) -> Self {
        Self { address, layout }
    }

    /// Create a register with default layout
    pub fn with_address(address: u64) -> Self
    where
        T: Default,
    {
        Self {
            address,
            layout: T::default(),
        }
    }

    /// Validate the register layout
    pub fn validate(&self) -> Result<(), &'static str> {
        self.layout.validate()
    }

    /// Get the MSR value for this register
    pub fn to_msr_value(&self) -> u64 {
        self.layout.to_msr_value()
    }

    /// Update the layout from an MSR value
    pub fn from_msr_value(&mut self, value: u64) {
        self.layout = T::from_msr_value(value);
    }
}
