#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn stub() -> UserId {
        UserId(crate::STUB_ID)
    }
}

/// Display metadata for the author of a comment
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: UserId,
    pub handle: String,
    pub avatar_url: String,
    pub verified: bool,
}

impl Author {
    pub fn stub(id: UserId, handle: &str) -> Author {
        Author {
            id,
            handle: String::from(handle),
            avatar_url: String::new(),
            verified: false,
        }
    }
}
