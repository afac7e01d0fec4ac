// ============================================================================
// App Command Layer
// ============================================================================
//
// The three demo apps expressed as screens over a shared context. Every
// operation here logs failures and carries on with empty or zero results;
// the layers below propagate errors.
//
// ============================================================================

pub mod dog_walk;
pub mod hit_list;
pub mod venue_filter;

pub use dog_walk::{DEFAULT_DOG_NAME, DogWalkLog, WALKS_SECTION_TITLE, format_walk_date, walk_label};
pub use hit_list::HitList;
pub use venue_filter::{
    FilterChoice, FilterPredicates, FilterRow, FilterScreen, FilterSection, FilterState,
    FilterSummary, WALKING_DISTANCE, fetch_venues,
};
