// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::{
    AclEntry, FIELD_ACLS, FIELD_AVERSION, FIELD_CTIME, FIELD_CVERSION, FIELD_CZXID, FIELD_DATA,
    FIELD_EPHEMERAL_OWNER, FIELD_MTIME, FIELD_MZXID, FIELD_PZXID, FIELD_VERSION, REQUIRED_FIELDS,
};
use crate::node::{Acl, NodeRecord, NodeStat};
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use diagnostics::log_debug;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use std::fmt;
use std::io::Read;

/// Parse a backup stream, handing each record to `apply` as soon as its
/// object closes
///
/// Returns the number of records applied. Parsing stops at the first error,
/// whether it comes from the stream or from `apply`; records before it have
/// already been applied.
pub fn read_records<R, F>(reader: R, mut apply: F) -> Result<usize>
where
    R: Read,
    F: FnMut(NodeRecord) -> Result<()>,
{
    let mut de = serde_json::Deserializer::from_reader(reader);
    let mut failure = None;
    let visitor = RecordStream {
        apply: &mut apply,
        failure: &mut failure,
    };
    let parsed = de.deserialize_map(visitor);
    if let Some(err) = failure {
        return Err(err);
    }
    let count = parsed.map_err(Error::Malformed)?;
    de.end().map_err(Error::Malformed)?;
    Ok(count)
}

/// Visits the top-level object one member at a time
///
/// Errors that are not serde errors (missing fields, failures while applying
/// a record) are parked in `failure` and the parse is aborted with a
/// placeholder error that [`read_records`] discards.
struct RecordStream<'a, F> {
    apply: &'a mut F,
    failure: &'a mut Option<Error>,
}

impl<'de, F> Visitor<'de> for RecordStream<'_, F>
where
    F: FnMut(NodeRecord) -> Result<()>,
{
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping node paths to node records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<usize, A::Error> {
        let mut count = 0;
        while let Some(path) = map.next_key::<String>()? {
            let builder: NodeRecordBuilder = map.next_value()?;
            let outcome = builder
                .build(path)
                .and_then(|record| (self.apply)(record));
            if let Err(err) = outcome {
                *self.failure = Some(err);
                return Err(de::Error::custom("restore aborted"));
            }
            count += 1;
        }
        Ok(count)
    }
}

/// Accumulates one record object's fields until the object closes
#[derive(Debug, Default)]
struct NodeRecordBuilder {
    stat: NodeStat,
    ephemeral_owner: Option<i64>,
    data: Option<Option<Vec<u8>>>,
    acls: Option<Vec<Acl>>,
}

impl NodeRecordBuilder {
    fn missing(&self) -> Vec<&'static str> {
        let seen = [
            self.ephemeral_owner.is_some(),
            self.data.is_some(),
            self.acls.is_some(),
        ];
        REQUIRED_FIELDS
            .iter()
            .zip(seen)
            .filter(|(_, seen)| !seen)
            .map(|(field, _)| *field)
            .collect()
    }

    fn build(self, path: String) -> Result<NodeRecord> {
        let missing = self.missing();
        let (Some(ephemeral_owner), Some(data), Some(acls)) =
            (self.ephemeral_owner, self.data, self.acls)
        else {
            return Err(Error::MissingFields { path, missing });
        };

        let data_length = data
            .as_ref()
            .map_or(0, |d| i32::try_from(d.len()).unwrap_or(i32::MAX));
        Ok(NodeRecord {
            path,
            stat: NodeStat {
                ephemeral_owner,
                data_length,
                num_children: 0,
                ..self.stat
            },
            data,
            acls,
        })
    }
}

impl<'de> Deserialize<'de> for NodeRecordBuilder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(NodeRecordVisitor)
    }
}

struct NodeRecordVisitor;

impl<'de> Visitor<'de> for NodeRecordVisitor {
    type Value = NodeRecordBuilder;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a node record object")
    }

    fn visit_map<A: MapAccess<'de>>(
        self,
        mut map: A,
    ) -> std::result::Result<NodeRecordBuilder, A::Error> {
        let mut builder = NodeRecordBuilder::default();
        while let Some(field) = map.next_key::<String>()? {
            match field.as_str() {
                FIELD_EPHEMERAL_OWNER => builder.ephemeral_owner = Some(map.next_value()?),
                FIELD_DATA => {
                    let encoded: Option<String> = map.next_value()?;
                    let data = encoded
                        .map(|text| STANDARD.decode(text))
                        .transpose()
                        .map_err(|e| de::Error::custom(format!("invalid base64 data: {e}")))?;
                    builder.data = Some(data);
                }
                FIELD_ACLS => {
                    let entries: Vec<AclEntry> = map.next_value()?;
                    builder.acls = Some(entries.into_iter().map(Acl::from).collect());
                }
                FIELD_AVERSION => builder.stat.aversion = map.next_value()?,
                FIELD_CVERSION => builder.stat.cversion = map.next_value()?,
                FIELD_VERSION => builder.stat.version = map.next_value()?,
                FIELD_CTIME => builder.stat.ctime = map.next_value()?,
                FIELD_MTIME => builder.stat.mtime = map.next_value()?,
                FIELD_CZXID => builder.stat.czxid = map.next_value()?,
                FIELD_MZXID => builder.stat.mzxid = map.next_value()?,
                FIELD_PZXID => builder.stat.pzxid = map.next_value()?,
                other => {
                    log_debug!("Ignored field: {field}", field: other);
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(builder)
    }
}
