//! Row-level visibility of record collections.

use std::sync::Arc;

use crate::text::normalize;
use crate::{AreaScopeResolver, AuthorizationContext, ScopedRecord, Scope};

/// Keeps the records an [`AuthorizationContext`] may see.
///
/// Applied on top of whatever coarse query produced the collection.
/// Filtering is order-preserving and idempotent.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    areas: Arc<AreaScopeResolver>,
}

impl RecordFilter {
    pub fn new(areas: Arc<AreaScopeResolver>) -> Self {
        Self { areas }
    }

    /// Borrowing filter for list views.
    pub fn filter<'a, R: ScopedRecord>(&self, records: &'a [R], ctx: &AuthorizationContext) -> Vec<&'a R> {
        records.iter().filter(|r| self.is_visible(*r, ctx)).collect()
    }

    /// Owning filter: drops invisible records in place.
    pub fn retain<R: ScopedRecord>(&self, mut records: Vec<R>, ctx: &AuthorizationContext) -> Vec<R> {
        records.retain(|r| self.is_visible(r, ctx));
        records
    }

    /// Whether one record is visible; also gates mutations of a single record.
    pub fn is_visible<R: ScopedRecord + ?Sized>(&self, record: &R, ctx: &AuthorizationContext) -> bool {
        if ctx.is_global_admin() {
            return true;
        }

        match ctx.scope() {
            Scope::Global => true,
            Scope::AreaRestricted { area } => {
                self.areas.resolve(record.position(), record.business_unit()) == Some(*area)
            }
            Scope::LocationRestricted {
                location,
                business_unit,
            } => {
                let Some(location) = location else {
                    return false;
                };
                if normalize(record.location()) != *location {
                    return false;
                }
                match business_unit {
                    Some(unit) => normalize(record.business_unit()) == *unit,
                    None => true,
                }
            }
        }
    }
}
