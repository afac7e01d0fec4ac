//! Filter screen of the venue finder: per-category counts, the deal total,
//! and the single predicate + sort descriptor the user picks.

use crate::core::{Result, Value};
use crate::model::{PriceCategory, Stored, Venue, VenueField};
use crate::query::{
    AggregateRequest, ExpressionDescription, FetchRequest, Predicate, SortDescriptor, count_where,
};
use crate::storage::Context;
use log::warn;

/// Metres considered walkable.
pub const WALKING_DISTANCE: f64 = 500.0;

const SUM_DEALS: &str = "sumDeals";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSection {
    Price,
    MostPopular,
    Sort,
}

/// A tappable row of the filter screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterRow {
    CheapVenue,
    ModerateVenue,
    ExpensiveVenue,
    OfferingDeal,
    WalkingDistance,
    UserTips,
    NameAz,
    NameZa,
    Distance,
    Price,
}

impl FilterRow {
    pub const ALL: [FilterRow; 10] = [
        Self::CheapVenue,
        Self::ModerateVenue,
        Self::ExpensiveVenue,
        Self::OfferingDeal,
        Self::WalkingDistance,
        Self::UserTips,
        Self::NameAz,
        Self::NameZa,
        Self::Distance,
        Self::Price,
    ];

    pub fn section(&self) -> FilterSection {
        match self {
            Self::CheapVenue | Self::ModerateVenue | Self::ExpensiveVenue => FilterSection::Price,
            Self::OfferingDeal | Self::WalkingDistance | Self::UserTips => FilterSection::MostPopular,
            Self::NameAz | Self::NameZa | Self::Distance | Self::Price => FilterSection::Sort,
        }
    }

    pub fn sort_descriptor(&self) -> Result<Option<SortDescriptor<Venue>>> {
        let sort = match self {
            Self::NameAz => SortDescriptor::<Venue>::ascending(VenueField::Name)?,
            Self::NameZa => SortDescriptor::<Venue>::descending(VenueField::Name)?,
            Self::Distance => SortDescriptor::<Venue>::ascending(VenueField::Distance)?,
            Self::Price => SortDescriptor::<Venue>::ascending(VenueField::PriceCategory)?,
            _ => return Ok(None),
        };
        Ok(Some(sort))
    }
}

/// The predicates behind the price and most-popular rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicates {
    pub cheap: Predicate<Venue>,
    pub moderate: Predicate<Venue>,
    pub expensive: Predicate<Venue>,
    pub offering_deal: Predicate<Venue>,
    pub walking_distance: Predicate<Venue>,
    pub has_user_tips: Predicate<Venue>,
}

impl FilterPredicates {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cheap: Self::price(PriceCategory::Cheap)?,
            moderate: Self::price(PriceCategory::Moderate)?,
            expensive: Self::price(PriceCategory::Expensive)?,
            offering_deal: Predicate::<Venue>::greater_than(VenueField::SpecialCount, 0)?,
            walking_distance: Predicate::<Venue>::less_than(VenueField::Distance, WALKING_DISTANCE)?,
            has_user_tips: Predicate::<Venue>::greater_than(VenueField::TipCount, 0)?,
        })
    }

    pub fn price(category: PriceCategory) -> Result<Predicate<Venue>> {
        Predicate::<Venue>::equals(VenueField::PriceCategory, category)
    }

    pub fn for_category(&self, category: PriceCategory) -> &Predicate<Venue> {
        match category {
            PriceCategory::Cheap => &self.cheap,
            PriceCategory::Moderate => &self.moderate,
            PriceCategory::Expensive => &self.expensive,
        }
    }

    fn for_row(&self, row: FilterRow) -> Option<&Predicate<Venue>> {
        match row {
            FilterRow::CheapVenue => Some(&self.cheap),
            FilterRow::ModerateVenue => Some(&self.moderate),
            FilterRow::ExpensiveVenue => Some(&self.expensive),
            FilterRow::OfferingDeal => Some(&self.offering_deal),
            FilterRow::WalkingDistance => Some(&self.walking_distance),
            FilterRow::UserTips => Some(&self.has_user_tips),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    NoSelection,
    PredicateSelected,
}

/// What the screen hands back when the user saves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterChoice {
    pub predicate: Option<Predicate<Venue>>,
    pub sort: Option<SortDescriptor<Venue>>,
}

/// Counts shown next to the filter rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterSummary {
    pub cheap: usize,
    pub moderate: usize,
    pub expensive: usize,
    pub total_deals: i64,
}

impl FilterSummary {
    pub fn count_for(&self, category: PriceCategory) -> usize {
        match category {
            PriceCategory::Cheap => self.cheap,
            PriceCategory::Moderate => self.moderate,
            PriceCategory::Expensive => self.expensive,
        }
    }

    pub fn price_label(&self, category: PriceCategory) -> String {
        format!("{} bubble tea places", self.count_for(category))
    }

    pub fn deals_label(&self) -> String {
        format!("{} total deals", self.total_deals)
    }
}

pub struct FilterScreen {
    predicates: FilterPredicates,
    sorts: Vec<(FilterRow, SortDescriptor<Venue>)>,
    selected_predicate: Option<Predicate<Venue>>,
    selected_sort: Option<SortDescriptor<Venue>>,
    checked: Vec<FilterRow>,
}

impl FilterScreen {
    pub fn new() -> Result<Self> {
        let mut sorts = Vec::new();
        for row in FilterRow::ALL {
            if let Some(sort) = row.sort_descriptor()? {
                sorts.push((row, sort));
            }
        }

        Ok(Self {
            predicates: FilterPredicates::new()?,
            sorts,
            selected_predicate: None,
            selected_sort: None,
            checked: Vec::new(),
        })
    }

    pub fn predicates(&self) -> &FilterPredicates {
        &self.predicates
    }

    /// Row tap. A predicate row replaces whatever predicate was selected
    /// before, in any section; a sort row replaces the sort descriptor.
    /// Tapped rows stay checked.
    pub fn select(&mut self, row: FilterRow) {
        if let Some(predicate) = self.predicates.for_row(row) {
            self.selected_predicate = Some(predicate.clone());
        } else if let Some((_, sort)) = self.sorts.iter().find(|(sort_row, _)| *sort_row == row) {
            self.selected_sort = Some(sort.clone());
        }

        if !self.checked.contains(&row) {
            self.checked.push(row);
        }
    }

    pub fn state(&self) -> FilterState {
        match self.selected_predicate {
            Some(_) => FilterState::PredicateSelected,
            None => FilterState::NoSelection,
        }
    }

    pub fn selected_predicate(&self) -> Option<&Predicate<Venue>> {
        self.selected_predicate.as_ref()
    }

    pub fn selected_sort(&self) -> Option<&SortDescriptor<Venue>> {
        self.selected_sort.as_ref()
    }

    pub fn is_checked(&self, row: FilterRow) -> bool {
        self.checked.contains(&row)
    }

    pub fn checked_rows(&self) -> &[FilterRow] {
        &self.checked
    }

    /// Closes the screen, returning the selection.
    pub fn save(self) -> FilterChoice {
        FilterChoice {
            predicate: self.selected_predicate,
            sort: self.selected_sort,
        }
    }

    /// Fetch failures are logged and leave the affected count at zero.
    pub fn summary(&self, ctx: &Context) -> FilterSummary {
        let mut summary = FilterSummary::default();

        for category in PriceCategory::ALL {
            let count = match count_where(ctx, self.predicates.for_category(category)) {
                Ok(count) => count,
                Err(err) => {
                    warn!("Could not fetch {} venue count: {}", category, err);
                    0
                }
            };
            match category {
                PriceCategory::Cheap => summary.cheap = count,
                PriceCategory::Moderate => summary.moderate = count,
                PriceCategory::Expensive => summary.expensive = count,
            }
        }

        summary.total_deals = match total_deals(ctx) {
            Ok(total) => total,
            Err(err) => {
                warn!("Could not fetch {}: {}", SUM_DEALS, err);
                0
            }
        };
        summary
    }
}

fn total_deals(ctx: &Context) -> Result<i64> {
    let request = AggregateRequest::<Venue>::new(vec![ExpressionDescription::<Venue>::sum(
        SUM_DEALS,
        VenueField::SpecialCount,
    )?]);
    let result = ctx.aggregate(&request)?;
    Ok(result.get(SUM_DEALS).and_then(Value::as_i64).unwrap_or(0))
}

/// The venue list behind the filter screen. Failures are logged and yield
/// an empty list.
pub fn fetch_venues(ctx: &Context, choice: &FilterChoice) -> Vec<Stored<Venue>> {
    let mut request = FetchRequest::new().filter_opt(choice.predicate.clone());
    if let Some(sort) = &choice.sort {
        request = request.sort_by(sort.clone());
    }

    ctx.fetch(&request).unwrap_or_else(|err| {
        warn!("Could not fetch venues: {}", err);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_map_to_sections() {
        assert_eq!(FilterRow::ModerateVenue.section(), FilterSection::Price);
        assert_eq!(FilterRow::UserTips.section(), FilterSection::MostPopular);
        assert_eq!(FilterRow::Distance.section(), FilterSection::Sort);
        assert_eq!(
            FilterRow::ALL.iter().filter(|r| r.section() == FilterSection::Sort).count(),
            4
        );
    }

    #[test]
    fn test_only_sort_rows_have_descriptors() {
        for row in FilterRow::ALL {
            let sort = row.sort_descriptor().unwrap();
            assert_eq!(sort.is_some(), row.section() == FilterSection::Sort, "{:?}", row);
        }
        assert_eq!(
            FilterRow::Price.sort_descriptor().unwrap().map(|s| s.field()),
            Some(VenueField::PriceCategory)
        );
    }

    #[test]
    fn test_last_predicate_wins_across_sections() {
        let mut screen = FilterScreen::new().unwrap();
        assert_eq!(screen.state(), FilterState::NoSelection);

        screen.select(FilterRow::ModerateVenue);
        assert_eq!(screen.state(), FilterState::PredicateSelected);
        screen.select(FilterRow::OfferingDeal);

        let offering_deal = screen.predicates().offering_deal.clone();
        assert_eq!(screen.selected_predicate(), Some(&offering_deal));
        assert!(screen.is_checked(FilterRow::ModerateVenue));
        assert!(screen.is_checked(FilterRow::OfferingDeal));

        let choice = screen.save();
        assert_eq!(choice.predicate, Some(offering_deal));
        assert_eq!(choice.sort, None);
    }

    #[test]
    fn test_sort_row_keeps_predicate() {
        let mut screen = FilterScreen::new().unwrap();
        screen.select(FilterRow::CheapVenue);
        screen.select(FilterRow::NameZa);

        let choice = screen.save();
        assert_eq!(choice.sort, Some(SortDescriptor::<Venue>::descending(VenueField::Name).unwrap()));
        assert_eq!(
            choice.predicate.map(|p| p.to_string()),
            Some("priceInfo.priceCategory == '$'".to_string())
        );
    }

    #[test]
    fn test_summary_labels() {
        let summary = FilterSummary {
            cheap: 3,
            moderate: 0,
            expensive: 1,
            total_deals: 7,
        };
        assert_eq!(summary.price_label(PriceCategory::Cheap), "3 bubble tea places");
        assert_eq!(summary.deals_label(), "7 total deals");
    }
}
