//! Guessing a user's standard, zero and exempt tax types from their Xero tax
//! rate catalog.

use log::{debug, warn};
use rust_decimal::Decimal;

use crate::{
    storage::Storage,
    wallet::non_blank,
    xero_client::{LedgerClient, TaxRate},
    AccessToken, ExtensionSettings, XeroSync, XeroSyncError,
};

/// Name or tax type fragments identifying rates managed by an external tax
/// engine.
const THIRD_PARTY_MARKERS: [&str; 2] = ["avalara", "avatax"];
const EXEMPT_MARKERS: [&str; 2] = ["exempt", "out of scope"];
const ZERO_MARKERS: [&str; 4] = ["zero", "0%", "no tax", "none"];

/// Tax types chosen for each category. `None` where nothing fit.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaxMapping {
    /// Tax type for standard-rated sales.
    pub standard: Option<String>,
    /// Tax type for zero-rated sales.
    pub zero: Option<String>,
    /// Tax type for exempt sales.
    pub exempt: Option<String>,
}

impl TaxMapping {
    /// Fill the settings' tax fields that are still blank. Returns whether
    /// anything changed.
    pub fn apply(&self, settings: &mut ExtensionSettings) -> bool {
        let mut changed = false;
        for (field, value) in [
            (&mut settings.xero_tax_standard, &self.standard),
            (&mut settings.xero_tax_zero, &self.zero),
            (&mut settings.xero_tax_exempt, &self.exempt),
        ] {
            if non_blank(field.as_deref()).is_none() && value.is_some() {
                field.clone_from(value);
                changed = true;
            }
        }
        changed
    }
}

struct Candidate<'a> {
    tax_type: &'a str,
    name: String,
    rate: Option<Decimal>,
    revenue: bool,
    third_party: bool,
}

impl<'a> Candidate<'a> {
    fn new(rate: &'a TaxRate) -> Option<Self> {
        if rate
            .status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("DELETED"))
        {
            return None;
        }
        let tax_type = non_blank(rate.tax_type.as_deref())?;
        let name = rate.name.as_deref().unwrap_or_default().to_lowercase();
        let third_party = contains_any(&name, &THIRD_PARTY_MARKERS)
            || contains_any(&tax_type.to_lowercase(), &THIRD_PARTY_MARKERS);

        Some(Candidate {
            tax_type,
            name,
            rate: rate.effective_rate.or(rate.display_tax_rate),
            revenue: rate.can_apply_to_revenue.unwrap_or(false),
            third_party,
        })
    }

    fn is_zero(&self) -> bool {
        self.rate.is_some_and(|rate| rate.is_zero())
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Highest rate wins, unknown rates lose to any known one, and ties go to the
/// earliest entry.
fn highest<'c, 'a: 'c>(candidates: impl Iterator<Item = &'c Candidate<'a>>) -> Option<&'c Candidate<'a>> {
    candidates.fold(None, |best, candidate| match best {
        Some(best) if candidate.rate <= best.rate => Some(best),
        _ => Some(candidate),
    })
}

/// Pick tax types for the standard, zero and exempt categories from a tax rate
/// catalog.
///
/// Deleted rates and rates without a tax type are ignored. Rates whose name or
/// type refers to Avalara are treated as third-party rates and only used when
/// nothing else fits.
#[must_use]
pub fn classify_tax_rates(rates: &[TaxRate]) -> TaxMapping {
    let candidates: Vec<Candidate> = rates.iter().filter_map(Candidate::new).collect();
    let revenue = || candidates.iter().filter(|c| c.revenue);

    let standard = highest(revenue().filter(|c| !c.third_party && c.rate > Some(Decimal::ZERO)))
        .or_else(|| highest(revenue().filter(|c| c.third_party)))
        .or_else(|| highest(revenue()));

    let zero = revenue()
        .find(|c| !c.third_party && c.is_zero() && contains_any(&c.name, &ZERO_MARKERS));

    let exempt_like = || {
        candidates
            .iter()
            .filter(|c| contains_any(&c.name, &EXEMPT_MARKERS))
    };
    let exempt = exempt_like()
        .find(|c| !c.third_party)
        .or_else(|| exempt_like().next());

    TaxMapping {
        standard: standard.map(|c| c.tax_type.to_string()),
        zero: zero.map(|c| c.tax_type.to_string()),
        exempt: exempt.map(|c| c.tax_type.to_string()),
    }
}

impl<S: Storage + 'static, C: LedgerClient> XeroSync<S, C> {
    /// Fetch the tax rate catalog and fill in whichever of the user's tax
    /// mappings are still blank. Never overwrites a mapping the user set.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn auto_map_tax_rates(&self, user_id: &str, token: &AccessToken) {
        match self.try_auto_map_tax_rates(user_id, token).await {
            Ok(mapping) => debug!("Tax rates of user {user_id} mapped to {mapping:?}"),
            Err(e) => warn!("Could not map Xero tax rates of user {user_id}: {e}"),
        }
    }

    async fn try_auto_map_tax_rates(
        &self,
        user_id: &str,
        token: &AccessToken,
    ) -> Result<TaxMapping, XeroSyncError> {
        let rates = self.client.tax_rates(token).await?;
        let mapping = classify_tax_rates(&rates);
        let mut settings = self.settings(user_id).await?;
        if mapping.apply(&mut settings) {
            self.update_settings(settings).await?;
        }
        Ok(mapping)
    }
}
