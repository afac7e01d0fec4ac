//! A flat list of people's names.

use crate::model::{Person, Stored};
use crate::query::fetch_all;
use crate::storage::Context;
use log::{error, warn};

pub const TITLE: &str = "The List";

#[derive(Debug, Default)]
pub struct HitList {
    people: Vec<Stored<Person>>,
}

impl HitList {
    /// Fetches every saved person. A failed fetch is logged and leaves the
    /// list empty.
    pub fn load(ctx: &Context) -> Self {
        let people = fetch_all::<Person>(ctx, None, None).unwrap_or_else(|err| {
            warn!("Could not fetch people: {}", err);
            Vec::new()
        });
        Self { people }
    }

    pub fn people(&self) -> &[Stored<Person>] {
        &self.people
    }

    pub fn names(&self) -> Vec<&str> {
        self.people.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Inserts a person named `name` and saves. The person joins the list
    /// only if the save succeeded; otherwise the insert stays pending.
    pub fn add_name(&mut self, ctx: &mut Context, name: &str) -> Option<&Stored<Person>> {
        let person = ctx.insert(Person::new(name));
        if let Err(err) = ctx.save() {
            error!("Could not save '{}': {}", name, err);
            return None;
        }
        self.people.push(person);
        self.people.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_name_appends_after_save() {
        let mut ctx = Context::in_memory();
        let mut list = HitList::load(&ctx);
        assert!(list.is_empty());

        let id = list.add_name(&mut ctx, "Ann").unwrap().id();
        list.add_name(&mut ctx, "Bob").unwrap();
        assert_eq!(list.names(), ["Ann", "Bob"]);

        let reloaded = HitList::load(&ctx);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.people().iter().any(|p| p.id() == id));
    }

    #[test]
    fn test_failed_save_is_not_listed() {
        let mut ctx = Context::in_memory();
        let mut list = HitList::load(&ctx);

        // A staged delete of an unknown object makes every later save fail.
        let ghost = ctx.insert(Person::new("ghost"));
        ctx.rollback();
        ctx.delete(&ghost);

        assert!(list.add_name(&mut ctx, "Ann").is_none());
        assert!(list.is_empty());
        assert_eq!(ctx.pending_changes().len(), 2);
    }
}
