//! The party dictionary used to decode party header text.
//!
//! Every entry lists the fragments of the party name as they read normally and,
//! separately, fragments observed in mirrored exports. Mirrored text is not a
//! plain reversal of the whole name: the exporter reverses line by line, so a
//! wrapped name comes out with its words in a different order. Canonical
//! fragments are matched in both orientations, explicit mirrored fragments are
//! matched as they are.
//!
//! Entries are consulted in order and the first match wins. A party whose name
//! contains another party's name ("All India Anna Dravida Munnetra Kazhagam"
//! contains "Dravida Munnetra Kazhagam") must be listed first.

/// Bumped whenever an entry is added, removed or reordered.
pub const PARTY_TABLE_VERSION: u32 = 3;

#[derive(Debug, PartialEq)]
pub struct PartyEntry {
    pub label: &'static str,
    pub fragments: &'static [&'static str],
    pub mirrored: &'static [&'static str],
}

pub const PARTY_TABLE: &[PartyEntry] = &[
    PartyEntry {
        label: "AIADMK",
        fragments: &[
            "all india anna dravida munnetra kazhagam",
            "anna dravida munnetra",
            "aiadmk",
        ],
        mirrored: &[
            "anna magahzak artenn",
            "artennum anna magahz",
            "artennum magahzak ai",
        ],
    },
    PartyEntry {
        label: "AMMK",
        fragments: &["amma makkal munnettra kazagam", "amma makkal munnetra", "ammk"],
        mirrored: &[
            "arttennum magazak la",
            "arttenum magazak lak",
            "lakkam arttennum mag",
        ],
    },
    PartyEntry {
        label: "MDMK",
        fragments: &["marumalarchi dravida munnetra kazhagam", "mdmk"],
        mirrored: &[],
    },
    PartyEntry {
        label: "DMDK",
        fragments: &["desiya murpokku dravida kazhagam", "dmdk"],
        mirrored: &[],
    },
    PartyEntry {
        label: "DMK",
        fragments: &["dravida munnetra kazhagam", "dmk"],
        mirrored: &["magahzak artennum ad", "artennum magahzak ad"],
    },
    PartyEntry {
        label: "INC",
        fragments: &["indian national congress"],
        mirrored: &["lanoitan ssergnoc na", "lanoitan ssergnoc naidni"],
    },
    PartyEntry {
        label: "BJP",
        fragments: &["bharatiya janata party", "bhartiya janta party"],
        mirrored: &[],
    },
    PartyEntry {
        label: "PMK",
        fragments: &["pattali makkal katchi"],
        mirrored: &["ilattap lakkam ihcta"],
    },
    PartyEntry {
        label: "NTK",
        fragments: &["naam tamilar katchi"],
        mirrored: &["ralimat maan ihctak", "ralimat ihctak maan"],
    },
    PartyEntry {
        label: "MNM",
        fragments: &["makkal needhi maiam"],
        mirrored: &[
            "maiam lakkam ihdeen",
            "lakkam ihdeen maiam",
            "ihdeen lakkam maiam",
        ],
    },
    PartyEntry {
        label: "BSP",
        fragments: &["bahujan samaj party"],
        mirrored: &[
            "ytrap najuhab jamas",
            "jamas najuhab ytrap",
            "najuhab jamas ytrap",
        ],
    },
    PartyEntry {
        label: "DMKT",
        fragments: &["desiya makkal katchi"],
        mirrored: &["lakkam ihctak ayised"],
    },
    PartyEntry {
        label: "DMSK",
        fragments: &["desiya makkal sakthi katchi"],
        mirrored: &["ayised lakkam ihtkas"],
    },
    PartyEntry {
        label: "SDPI",
        fragments: &["social democratic party of india"],
        mirrored: &["uhtiana lakkam layis"],
    },
    PartyEntry {
        label: "RPI(A)",
        fragments: &["republican party of india (athawale)"],
        mirrored: &["nacilbuper )elawahta"],
    },
    PartyEntry {
        label: "RPI",
        fragments: &["republican party of india"],
        mirrored: &["aidni nacilbuper )el"],
    },
    PartyEntry {
        label: "DPI",
        fragments: &["democratic party of india"],
        mirrored: &["aidni citarcoomed fo"],
    },
    PartyEntry {
        label: "NOTA",
        fragments: &["none of the above", "nota"],
        mirrored: &[],
    },
];

/// Fragments meaning "independent candidate", matched in both orientations.
pub const INDEPENDENT_FRAGMENTS: &[&str] = &["independent", "independe"];

/// A digest of the dictionary content, recorded in the outputs so that a
/// summary can be traced back to the dictionary that decoded it.
pub fn party_table_fingerprint() -> String {
    let mut content = format!("v{}", PARTY_TABLE_VERSION);
    for entry in PARTY_TABLE.iter() {
        content.push_str(&format!(
            "|{}:{}:{}",
            entry.label,
            entry.fragments.join(","),
            entry.mirrored.join(",")
        ));
    }
    content.push_str(&format!("|independent:{}", INDEPENDENT_FRAGMENTS.join(",")));
    sha256::digest(content)
}

pub fn reverse_text(s: &str) -> String {
    s.chars().rev().collect()
}

/// Finds the first entry matching the fragment, which is expected in lower case.
pub fn lookup_party(fragment: &str) -> Option<&'static PartyEntry> {
    PARTY_TABLE.iter().find(|entry| entry_matches(entry, fragment))
}

pub fn is_independent(fragment: &str) -> bool {
    INDEPENDENT_FRAGMENTS
        .iter()
        .any(|f| contains_either_way(fragment, f))
}

fn entry_matches(entry: &PartyEntry, fragment: &str) -> bool {
    entry
        .fragments
        .iter()
        .any(|f| contains_either_way(fragment, f))
        || entry.mirrored.iter().any(|m| fragment.contains(m))
}

fn contains_either_way(fragment: &str, pattern: &str) -> bool {
    fragment.contains(pattern) || fragment.contains(&reverse_text(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_names_shadow_shorter_ones() {
        assert_eq!(
            lookup_party("all india anna dravida munnetra kazhagam").map(|e| e.label),
            Some("AIADMK")
        );
        assert_eq!(
            lookup_party("marumalarchi dravida munnetra kazhagam").map(|e| e.label),
            Some("MDMK")
        );
        assert_eq!(
            lookup_party("dravida munnetra kazhagam").map(|e| e.label),
            Some("DMK")
        );
    }

    #[test]
    fn observed_mirrored_fragments() {
        assert_eq!(
            lookup_party("artennum magahzak ad").map(|e| e.label),
            Some("DMK")
        );
        assert_eq!(
            lookup_party("artennum magahzak ai").map(|e| e.label),
            Some("AIADMK")
        );
        assert_eq!(
            lookup_party("lanoitan ssergnoc naidni").map(|e| e.label),
            Some("INC")
        );
        assert_eq!(lookup_party("some local front"), None);
    }

    #[test]
    fn independent_both_ways() {
        assert!(is_independent("independent"));
        assert!(is_independent("tnednepedni"));
        assert!(!is_independent("indian national congress"));
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = party_table_fingerprint();
        assert_eq!(a, party_table_fingerprint());
        assert_eq!(a.len(), 64);
    }
}
