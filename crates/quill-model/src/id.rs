//! ID prefixes, tree roots, and the free-ID allocator.

/// Chapter ID prefix.
pub const CHAPTER_PREFIX: &str = "ch";
/// Section ID prefix.
pub const SECTION_PREFIX: &str = "sc";
/// Plot point ID prefix.
pub const PLOT_POINT_PREFIX: &str = "pp";
/// Plot line ID prefix.
pub const PLOT_LINE_PREFIX: &str = "pl";
/// Character ID prefix.
pub const CHARACTER_PREFIX: &str = "cr";
/// Location ID prefix.
pub const LOCATION_PREFIX: &str = "lc";
/// Item ID prefix.
pub const ITEM_PREFIX: &str = "it";
/// Project note ID prefix.
pub const PRJ_NOTE_PREFIX: &str = "pn";

/// Tree root for chapters.
pub const CH_ROOT: &str = "ch_root";
/// Tree root for plot lines.
pub const PL_ROOT: &str = "pl_root";
/// Tree root for characters.
pub const CR_ROOT: &str = "cr_root";
/// Tree root for locations.
pub const LC_ROOT: &str = "lc_root";
/// Tree root for items.
pub const IT_ROOT: &str = "it_root";
/// Tree root for project notes.
pub const PN_ROOT: &str = "pn_root";

/// Return a new ID with `prefix` and the lowest positive number that does
/// not collide with any entry of `existing`.
pub fn create_id<S: AsRef<str>>(existing: &[S], prefix: &str) -> String {
    let mut n = 1u64;
    loop {
        let candidate = format!("{prefix}{n}");
        if !existing.iter().any(|id| id.as_ref() == candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// The numeric tail of a prefixed ID. All prefixes are two characters.
pub fn numeric_id(id: &str) -> &str {
    &id[2..]
}

/// Split a stored list field into its trimmed, non-empty entries.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join list entries into the stored comma-separated form.
pub fn join_list<S: AsRef<str>>(entries: &[S]) -> String {
    entries
        .iter()
        .map(|entry| entry.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_id_picks_lowest_free_number() {
        let existing = vec!["sc1".to_string(), "sc2".to_string(), "sc4".to_string()];
        assert_eq!(create_id(&existing, "sc"), "sc3");
        assert_eq!(create_id(&Vec::<String>::new(), "ch"), "ch1");
    }

    #[test]
    fn list_round_trip() {
        let entries = split_list("alpha, beta ,gamma,,");
        assert_eq!(entries, vec!["alpha", "beta", "gamma"]);
        assert_eq!(join_list(&entries), "alpha, beta, gamma");
    }

    #[test]
    fn numeric_id_strips_prefix() {
        assert_eq!(numeric_id("ch12"), "12");
        assert_eq!(numeric_id("pp3"), "3");
    }
}
