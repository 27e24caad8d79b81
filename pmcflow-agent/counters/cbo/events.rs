// CBo event selections for Alder Lake client uncore
use pmcflow_raw::current_arch::cbo::{events, umasks, UncorePerfEvtSel};

use crate::enum_with_data;

// Name doubles as the key of the matching overall value
enum_with_data! {
    pub enum CboEvent: UncorePerfEvtSel {
        L3Lookups => ("L3 Lookups", UncorePerfEvtSel::counting(
            events::LLC_LOOKUP,
            umasks::llc_lookup::ALL,
        )),
        L3Misses => ("L3 Misses", UncorePerfEvtSel::counting(
            events::LLC_LOOKUP,
            umasks::llc_lookup::MISS,
        )),
        SnoopResponses => ("Snoop Responses", UncorePerfEvtSel::counting(
            events::XSNP_RESPONSE,
            umasks::xsnp_response::ALL,
        )),
        SnoopInvalidations => ("Snoop Invalidations", UncorePerfEvtSel::counting(
            events::XSNP_RESPONSE,
            umasks::xsnp_response::INVALIDATE
                | umasks::xsnp_response::INVALIDATE_ANY
                | umasks::xsnp_response::ANY_SOURCE,
        )),
        SnoopHits => ("Snoop Hits", UncorePerfEvtSel::counting(
            events::XSNP_RESPONSE,
            umasks::xsnp_response::HIT
                | umasks::xsnp_response::HITM
                | umasks::xsnp_response::ANY_SOURCE,
        )),
    }
    impl selector -> UncorePerfEvtSel
}
