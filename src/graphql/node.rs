//! Global object identification.
//!
//! A global ID is the standard base64 encoding of `"<Type>:<uuid>"`, so any
//! node can be fetched through `node(id)` without knowing its type up front.

use async_graphql::ID;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    User,
    Post,
}

impl NodeKind {
    fn as_str(self) -> &'static str {
        match self {
            NodeKind::User => "User",
            NodeKind::Post => "Post",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "User" => Some(NodeKind::User),
            "Post" => Some(NodeKind::Post),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid global id '{0}'")]
pub struct InvalidGlobalId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalId {
    pub kind: NodeKind,
    pub uuid: Uuid,
}

impl GlobalId {
    pub fn new(kind: NodeKind, uuid: Uuid) -> Self {
        Self { kind, uuid }
    }

    pub fn encode(&self) -> ID {
        ID(STANDARD.encode(format!("{}:{}", self.kind.as_str(), self.uuid)))
    }

    pub fn decode(id: &str) -> Result<Self, InvalidGlobalId> {
        let invalid = || InvalidGlobalId(id.to_string());
        let raw = STANDARD.decode(id).map_err(|_| invalid())?;
        let raw = String::from_utf8(raw).map_err(|_| invalid())?;
        let (kind, uuid) = raw.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            kind: NodeKind::parse(kind).ok_or_else(invalid)?,
            uuid: Uuid::parse_str(uuid).map_err(|_| invalid())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_type_and_uuid() {
        let uuid = Uuid::parse_str("6f1c1b8e-1d3f-4a53-9d43-5b7e8c2a9f10").unwrap();
        let id = GlobalId::new(NodeKind::Post, uuid).encode();
        let raw = STANDARD.decode(id.as_str()).unwrap();
        assert_eq!(
            String::from_utf8(raw).unwrap(),
            "Post:6f1c1b8e-1d3f-4a53-9d43-5b7e8c2a9f10"
        );
        assert_eq!(GlobalId::decode(&id).unwrap(), GlobalId::new(NodeKind::Post, uuid));
    }

    #[test]
    fn rejects_unknown_types_and_garbage() {
        let unknown = STANDARD.encode(format!("Comment:{}", Uuid::new_v4()));
        assert!(GlobalId::decode(&unknown).is_err());
        assert!(GlobalId::decode("%%%").is_err());
        assert!(GlobalId::decode(&STANDARD.encode("User:not-a-uuid")).is_err());
        assert!(GlobalId::decode(&STANDARD.encode("no-separator")).is_err());
    }
}
