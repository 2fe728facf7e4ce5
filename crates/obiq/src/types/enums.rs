use indexmap::IndexMap;

/// A named mapping from member names to integer values.
///
/// Member values default to consecutive integers starting at 0; an explicit
/// `MEMBER = N` resets the running counter and subsequent members increment
/// from `N + 1`.
#[derive(Debug, Clone)]
pub struct EnumInstance {
    name: String,
    members: IndexMap<String, i64>,
}

impl EnumInstance {
    pub fn new(name: impl Into<String>, declared: &[(String, Option<i64>)]) -> Self {
        let mut members = IndexMap::with_capacity(declared.len());
        let mut next = 0;
        for (member, explicit) in declared {
            let value = explicit.unwrap_or(next);
            members.insert(member.clone(), value);
            next = value + 1;
        }
        Self {
            name: name.into(),
            members,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn has_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    #[must_use]
    pub fn member_value(&self, name: &str) -> Option<i64> {
        self.members.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, value: Option<i64>) -> (String, Option<i64>) {
        (name.to_owned(), value)
    }

    #[test]
    fn members_default_to_consecutive_from_zero() {
        let e = EnumInstance::new(
            "Color",
            &[member("RED", None), member("GREEN", None), member("BLUE", None)],
        );
        assert_eq!(e.member_value("RED"), Some(0));
        assert_eq!(e.member_value("GREEN"), Some(1));
        assert_eq!(e.member_value("BLUE"), Some(2));
    }

    #[test]
    fn explicit_value_resets_the_running_counter() {
        let e = EnumInstance::new(
            "Status",
            &[
                member("OK", None),
                member("WARN", Some(10)),
                member("FAIL", None),
            ],
        );
        assert_eq!(e.member_value("OK"), Some(0));
        assert_eq!(e.member_value("WARN"), Some(10));
        assert_eq!(e.member_value("FAIL"), Some(11));
    }
}
