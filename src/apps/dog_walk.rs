//! Walk log of a single dog, found by name or created on first launch.

use crate::core::Result;
use crate::model::{Dog, DogField, Stored, Walk};
use crate::query::{FetchRequest, Predicate};
use crate::storage::Context;
use chrono::{DateTime, Local, Utc};
use log::{error, warn};

pub const DEFAULT_DOG_NAME: &str = "Fido";

pub const WALKS_SECTION_TITLE: &str = "List of Walks";

/// Row label for a walk: short date followed by medium time,
/// e.g. `5/31/18, 9:05:12 AM`.
pub fn walk_label(walk: &Walk) -> String {
    walk.date
        .map(|date| format_walk_date(&date))
        .unwrap_or_default()
}

pub fn format_walk_date(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%-m/%-d/%y, %-I:%M:%S %p")
        .to_string()
}

/// The walk screen's state: the current dog, if one could be loaded.
pub struct DogWalkLog {
    dog: Option<Stored<Dog>>,
}

impl DogWalkLog {
    /// Finds the dog named `dog_name`, inserting and saving it when the store
    /// has none. Failures are logged; a failed fetch leaves no current dog.
    pub fn load(ctx: &mut Context, dog_name: &str) -> Self {
        let dog = match find_dog(ctx, dog_name) {
            Ok(Some(dog)) => Some(dog),
            Ok(None) => {
                let dog = ctx.insert(Dog::new(dog_name));
                if let Err(err) = ctx.save() {
                    error!("Could not save dog '{}': {}", dog_name, err);
                }
                Some(dog)
            }
            Err(err) => {
                error!("Could not fetch dog '{}': {}", dog_name, err);
                None
            }
        };
        Self { dog }
    }

    pub fn current_dog(&self) -> Option<&Stored<Dog>> {
        self.dog.as_ref()
    }

    pub fn walk_count(&self) -> usize {
        self.dog.as_ref().map_or(0, |dog| dog.walks.len())
    }

    /// The dog's walks in logged order. Walks not yet committed are skipped.
    pub fn walks(&self, ctx: &Context) -> Vec<Stored<Walk>> {
        let Some(dog) = &self.dog else {
            return Vec::new();
        };

        let mut walks = Vec::with_capacity(dog.walks.len());
        for id in &dog.walks {
            match ctx.existing::<Walk>(*id) {
                Ok(Some(walk)) => walks.push(walk),
                Ok(None) => {}
                Err(err) => warn!("Could not fetch walk {}: {}", id, err),
            }
        }
        walks
    }

    /// Logs a walk at `at` for the current dog and saves. The walk is
    /// returned even when the save fails; its changes stay pending.
    pub fn add_walk(&mut self, ctx: &mut Context, at: DateTime<Utc>) -> Option<Stored<Walk>> {
        // Pending changes would be lost by reloading the committed dog.
        if !ctx.has_changes() {
            self.refresh(ctx);
        }
        let dog = self.dog.as_mut()?;

        let mut walk = Walk::at(at);
        walk.dog = Some(dog.id());
        let walk = ctx.insert(walk);

        dog.walks.push(walk.id());
        ctx.update(&*dog);

        if let Err(err) = ctx.save() {
            error!("Could not save walk for '{}': {}", dog.name, err);
        }
        Some(walk)
    }

    /// Deletes the walk at `index` (in [`DogWalkLog::walks`] order) and
    /// saves. The deleted walk drops out of the dog's list on commit.
    pub fn remove_walk(&mut self, ctx: &mut Context, index: usize) -> bool {
        let Some(walk) = self.walks(ctx).into_iter().nth(index) else {
            return false;
        };

        ctx.delete(&walk);
        if let Err(err) = ctx.save() {
            error!("Could not delete walk {}: {}", walk.id(), err);
            return false;
        }

        self.refresh(ctx);
        true
    }

    fn refresh(&mut self, ctx: &Context) {
        let Some(id) = self.dog.as_ref().map(|dog| dog.id()) else {
            return;
        };
        match ctx.existing::<Dog>(id) {
            Ok(Some(dog)) => self.dog = Some(dog),
            Ok(None) => {}
            Err(err) => warn!("Could not reload dog {}: {}", id, err),
        }
    }
}

fn find_dog(ctx: &Context, name: &str) -> Result<Option<Stored<Dog>>> {
    let request = FetchRequest::<Dog>::new()
        .filter(Predicate::<Dog>::equals(DogField::Name, name)?)
        .limit(1);
    Ok(ctx.fetch(&request)?.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_first_load_creates_dog() {
        let mut ctx = Context::in_memory();
        let log = DogWalkLog::load(&mut ctx, DEFAULT_DOG_NAME);

        let dog = log.current_dog().unwrap();
        assert_eq!(dog.name, "Fido");
        assert!(!ctx.has_changes());

        let again = DogWalkLog::load(&mut ctx, DEFAULT_DOG_NAME);
        assert_eq!(again.current_dog().unwrap().id(), dog.id());
    }

    #[test]
    fn test_walks_keep_logged_order() {
        let mut ctx = Context::in_memory();
        let mut log = DogWalkLog::load(&mut ctx, DEFAULT_DOG_NAME);

        let first = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        log.add_walk(&mut ctx, first).unwrap();
        let walk = log.add_walk(&mut ctx, second).unwrap();

        assert_eq!(walk.dog, Some(log.current_dog().unwrap().id()));
        let dates: Vec<_> = log.walks(&ctx).iter().map(|w| w.date).collect();
        assert_eq!(dates, [Some(first), Some(second)]);
    }

    #[test]
    fn test_remove_walk_out_of_range() {
        let mut ctx = Context::in_memory();
        let mut log = DogWalkLog::load(&mut ctx, DEFAULT_DOG_NAME);
        assert!(!log.remove_walk(&mut ctx, 0));
        assert_eq!(log.walk_count(), 0);
    }

    #[test]
    fn test_label_of_undated_walk_is_empty() {
        assert_eq!(walk_label(&Walk::default()), "");
    }
}
