//! Well-known logical lock ids
//!
//! Each id names a coarse-grained resource. Migrations seed one row per id
//! listed in [`WELL_KNOWN_LOCKS`].

pub const SERVERS: i32 = -331;
pub const CONTENT_TYPES: i32 = -332;
pub const CONTENT_TREE: i32 = -333;
pub const MEDIA_TYPES: i32 = -334;
pub const MEDIA_TREE: i32 = -335;
pub const MEMBER_TYPES: i32 = -336;
pub const MEMBER_TREE: i32 = -337;
pub const DOMAINS: i32 = -338;
pub const KEY_VALUES: i32 = -339;
pub const LANGUAGES: i32 = -340;
pub const SCHEDULED_PUBLISHING: i32 = -341;

/// Held for the lifetime of the primary application instance
pub const MAIN_DOM: i32 = -1000;

/// Every well-known lock id with its display name
pub const WELL_KNOWN_LOCKS: &[(i32, &str)] = &[
    (SERVERS, "Servers"),
    (CONTENT_TYPES, "ContentTypes"),
    (CONTENT_TREE, "ContentTree"),
    (MEDIA_TYPES, "MediaTypes"),
    (MEDIA_TREE, "MediaTree"),
    (MEMBER_TYPES, "MemberTypes"),
    (MEMBER_TREE, "MemberTree"),
    (DOMAINS, "Domains"),
    (KEY_VALUES, "KeyValues"),
    (LANGUAGES, "Languages"),
    (SCHEDULED_PUBLISHING, "ScheduledPublishing"),
    (MAIN_DOM, "MainDom"),
];

/// Look up the display name of a well-known lock id
pub fn name_of(lock_id: i32) -> Option<&'static str> {
    WELL_KNOWN_LOCKS
        .iter()
        .find(|(id, _)| *id == lock_id)
        .map(|(_, name)| *name)
}
