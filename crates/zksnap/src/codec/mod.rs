// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The backup stream format
//!
//! A backup is a single JSON object whose members are node records keyed by
//! absolute path. Records are written as the tree is walked and applied as
//! they are parsed; neither direction holds the whole tree in memory.

mod decode;
mod encode;

use crate::node::{Acl, Identity, Perms};
use serde::{Deserialize, Serialize};

pub use decode::read_records;
pub use encode::{RecordSink, write_records};

pub const FIELD_AVERSION: &str = "aversion";
pub const FIELD_CTIME: &str = "ctime";
pub const FIELD_CVERSION: &str = "cversion";
pub const FIELD_CZXID: &str = "czxid";
pub const FIELD_EPHEMERAL_OWNER: &str = "ephemeralOwner";
pub const FIELD_MTIME: &str = "mtime";
pub const FIELD_MZXID: &str = "mzxid";
pub const FIELD_PZXID: &str = "pzxid";
pub const FIELD_VERSION: &str = "version";
pub const FIELD_DATA: &str = "data";
pub const FIELD_ACLS: &str = "acls";

/// Fields a record must carry to be restorable
pub const REQUIRED_FIELDS: [&str; 3] = [FIELD_EPHEMERAL_OWNER, FIELD_DATA, FIELD_ACLS];

/// Wire form of one ACL entry; the schema is closed
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct AclEntry {
    id: String,
    scheme: String,
    perms: i32,
}

impl From<&Acl> for AclEntry {
    fn from(acl: &Acl) -> Self {
        Self {
            id: acl.id.id().to_string(),
            scheme: acl.id.scheme().to_string(),
            perms: acl.perms.bits(),
        }
    }
}

impl From<AclEntry> for Acl {
    fn from(entry: AclEntry) -> Self {
        Acl::new(Perms(entry.perms), Identity::new(entry.scheme, entry.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeRecord, NodeStat};
    use crate::{Error, Result};

    fn sample(path: &str, data: Option<&[u8]>) -> NodeRecord {
        NodeRecord {
            path: path.to_string(),
            stat: NodeStat {
                czxid: 7,
                mzxid: 9,
                pzxid: 8,
                ctime: 1_700_000_000_000,
                mtime: 1_700_000_000_500,
                version: 2,
                cversion: 1,
                aversion: 3,
                ephemeral_owner: 0,
                data_length: data.map_or(0, |d| d.len() as i32),
                num_children: 0,
            },
            data: data.map(<[u8]>::to_vec),
            acls: vec![
                Acl::open(),
                Acl::new(Perms::READ, Identity::new("digest", "user:hash")),
            ],
        }
    }

    fn encode(records: &[NodeRecord], pretty: bool) -> Vec<u8> {
        let mut out = Vec::new();
        write_records(&mut out, pretty, |sink| {
            for record in records {
                sink.write_record(record)?;
            }
            Ok(())
        })
        .expect("encode");
        out
    }

    fn decode(bytes: &[u8]) -> Result<Vec<NodeRecord>> {
        let mut records = Vec::new();
        read_records(bytes, |record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    #[test]
    fn test_stream_shape() {
        let bytes = encode(&[sample("/a", Some(b"hello"))], false);
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        let node = &value["/a"];
        assert_eq!(node["aversion"], 3);
        assert_eq!(node["ctime"], 1_700_000_000_000_i64);
        assert_eq!(node["cversion"], 1);
        assert_eq!(node["czxid"], 7);
        assert_eq!(node["ephemeralOwner"], 0);
        assert_eq!(node["mtime"], 1_700_000_000_500_i64);
        assert_eq!(node["mzxid"], 9);
        assert_eq!(node["pzxid"], 8);
        assert_eq!(node["version"], 2);
        assert_eq!(node["data"], "aGVsbG8=");
        assert_eq!(node["acls"][0]["scheme"], "world");
        assert_eq!(node["acls"][0]["id"], "anyone");
        assert_eq!(node["acls"][0]["perms"], 31);
        assert!(node.get("dataLength").is_none());
        assert!(node.get("numChildren").is_none());
    }

    #[test]
    fn test_absent_data_is_null() {
        let bytes = encode(&[sample("/a", None)], false);
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert!(value["/a"]["data"].is_null());
    }

    #[test]
    fn test_records_survive_the_stream() {
        let records = vec![
            sample("/", None),
            sample("/a", Some(b"hello")),
            sample("/a/b", Some(&[0, 159, 146, 150])),
        ];
        for pretty in [false, true] {
            let decoded = decode(&encode(&records, pretty)).expect("decode");
            assert_eq!(decoded.len(), 3);
            for (got, want) in decoded.iter().zip(&records) {
                assert_eq!(got, want);
            }
        }
    }

    #[test]
    fn test_pretty_print_is_indented() {
        let compact = encode(&[sample("/a", None)], false);
        let pretty = encode(&[sample("/a", None)], true);
        assert!(!compact.contains(&b'\n'));
        assert!(pretty.contains(&b'\n'));
    }

    #[test]
    fn test_empty_backup() {
        let bytes = encode(&[], false);
        assert_eq!(bytes, b"{}");
        assert!(decode(&bytes).expect("decode").is_empty());
    }

    #[test]
    fn test_unknown_node_fields_are_ignored() {
        let input = br#"{"/a": {"ephemeralOwner": 0, "data": null, "acls": [],
            "dataLength": 0, "comment": {"nested": [1, 2, 3]}}}"#;
        let records = decode(input).expect("decode");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "/a");
        assert_eq!(records[0].data, None);
    }

    #[test]
    fn test_minimal_record_defaults_stat() {
        let input = br#"{"/a": {"acls": [{"scheme": "world", "id": "anyone", "perms": 1}],
            "data": "aGk=", "ephemeralOwner": 0}}"#;
        let records = decode(input).expect("decode");
        assert_eq!(records[0].stat.version, 0);
        assert_eq!(records[0].stat.data_length, 2);
        assert_eq!(records[0].acls, vec![Acl::new(Perms::READ, Identity::Anyone)]);
    }

    #[test]
    fn test_missing_required_fields_abort() {
        let input = br#"{"/ok": {"ephemeralOwner": 0, "data": null, "acls": []},
            "/bad": {"ephemeralOwner": 0, "version": 3}}"#;
        let mut seen = Vec::new();
        let err = read_records(&input[..], |record| {
            seen.push(record.path);
            Ok(())
        })
        .expect_err("missing fields");
        assert_eq!(seen, vec!["/ok".to_string()]);
        match err {
            Error::MissingFields { path, missing } => {
                assert_eq!(path, "/bad");
                assert_eq!(missing, vec!["data", "acls"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_acl_field_is_fatal() {
        let input = br#"{"/a": {"ephemeralOwner": 0, "data": null,
            "acls": [{"scheme": "world", "id": "anyone", "perms": 31, "expires": 1}]}}"#;
        assert!(matches!(decode(input), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_incomplete_acl_is_fatal() {
        let input = br#"{"/a": {"ephemeralOwner": 0, "data": null,
            "acls": [{"scheme": "world", "id": "anyone"}]}}"#;
        assert!(matches!(decode(input), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_bad_base64_is_fatal() {
        let input = br#"{"/a": {"ephemeralOwner": 0, "data": "%%%", "acls": []}}"#;
        assert!(matches!(decode(input), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_stream_must_be_an_object() {
        assert!(matches!(decode(b"[]"), Err(Error::Malformed(_))));
        assert!(matches!(decode(b"{} {}"), Err(Error::Malformed(_))));
        assert!(matches!(decode(b"{\"/a\": "), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_apply_failure_stops_the_stream() {
        let input = br#"{"/a": {"ephemeralOwner": 0, "data": null, "acls": []},
            "/b": {"ephemeralOwner": 0, "data": null, "acls": []}}"#;
        let mut calls = 0;
        let err = read_records(&input[..], |record| {
            calls += 1;
            Err(crate::ClientError::remote(record.path, "NoAuth").into())
        })
        .expect_err("apply failure");
        assert_eq!(calls, 1);
        assert!(matches!(err, Error::Client(_)));
    }
}
