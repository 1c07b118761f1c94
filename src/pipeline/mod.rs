//! List content pipeline shared by the events and dining pages:
//! meal resolution, predicate filter, comparator sort.

pub mod filter;
pub mod meal;
pub mod sort;

use serde::{Serialize, Serializer};

use crate::models::{DiningItem, Event};

pub use filter::{filter, DiningCriteria, DiningSelection, EventSelection, Predicate};
pub use meal::{resolve, MealSelector};
pub use sort::{sort, SortKey, Sortable};

/// What the render projection receives: the complete list, or an explicit empty state.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    Empty,
    Items(Vec<T>),
}

impl<T> Listing<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Listing::Empty => &[],
            Listing::Items(items) => items,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::Empty)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }
}

impl<T> From<Vec<T>> for Listing<T> {
    fn from(items: Vec<T>) -> Self {
        if items.is_empty() {
            Listing::Empty
        } else {
            Listing::Items(items)
        }
    }
}

impl<T: Serialize> Serialize for Listing<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items().serialize(serializer)
    }
}

pub fn run_events(master: &[Event], selection: &EventSelection) -> Listing<Event> {
    let filtered = filter(master, selection);
    sort(&filtered, selection.sort).into()
}

/// Dining results keep master-list order; the menu has no sort control.
pub fn run_dining(
    master: &[DiningItem],
    selection: &DiningSelection,
    hour: u32,
) -> (DiningCriteria, Listing<DiningItem>) {
    let criteria = selection.resolve(hour);
    let items = filter(master, &criteria);
    (criteria, items.into())
}
