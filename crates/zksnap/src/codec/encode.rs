// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::{
    AclEntry, FIELD_ACLS, FIELD_AVERSION, FIELD_CTIME, FIELD_CVERSION, FIELD_CZXID, FIELD_DATA,
    FIELD_EPHEMERAL_OWNER, FIELD_MTIME, FIELD_MZXID, FIELD_PZXID, FIELD_VERSION,
};
use crate::node::NodeRecord;
use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, SerializeStruct, Serializer};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use std::io::Write;

/// Receives records while a backup stream is open
pub trait RecordSink {
    fn write_record(&mut self, record: &NodeRecord) -> Result<()>;
}

/// Open the top-level object, let `body` write records into it, close it
///
/// Each record is serialized straight to `writer` as it arrives. If `body`
/// fails, whatever was already written stays written and the object is left
/// unterminated.
pub fn write_records<W, F>(mut writer: W, pretty: bool, body: F) -> Result<()>
where
    W: Write,
    F: FnOnce(&mut dyn RecordSink) -> Result<()>,
{
    if pretty {
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::new());
        write_with(&mut ser, body)?;
    } else {
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, CompactFormatter);
        write_with(&mut ser, body)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_with<W, Fm, F>(ser: &mut serde_json::Serializer<W, Fm>, body: F) -> Result<()>
where
    W: Write,
    Fm: Formatter,
    F: FnOnce(&mut dyn RecordSink) -> Result<()>,
{
    let mut map = ser.serialize_map(None).map_err(Error::Encode)?;
    body(&mut MapSink { map: &mut map })?;
    SerializeMap::end(map).map_err(Error::Encode)
}

struct MapSink<'a, M> {
    map: &'a mut M,
}

impl<M: SerializeMap<Error = serde_json::Error>> RecordSink for MapSink<'_, M> {
    fn write_record(&mut self, record: &NodeRecord) -> Result<()> {
        self.map
            .serialize_entry(&record.path, &EncodedNode(record))
            .map_err(Error::Encode)
    }
}

/// Record body: everything but the path, which is the member key
struct EncodedNode<'a>(&'a NodeRecord);

impl Serialize for EncodedNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let record = self.0;
        let stat = &record.stat;
        let mut node = serializer.serialize_struct("Node", 11)?;
        node.serialize_field(FIELD_AVERSION, &stat.aversion)?;
        node.serialize_field(FIELD_CTIME, &stat.ctime)?;
        node.serialize_field(FIELD_CVERSION, &stat.cversion)?;
        node.serialize_field(FIELD_CZXID, &stat.czxid)?;
        node.serialize_field(FIELD_EPHEMERAL_OWNER, &stat.ephemeral_owner)?;
        node.serialize_field(FIELD_MTIME, &stat.mtime)?;
        node.serialize_field(FIELD_MZXID, &stat.mzxid)?;
        node.serialize_field(FIELD_PZXID, &stat.pzxid)?;
        node.serialize_field(FIELD_VERSION, &stat.version)?;
        node.serialize_field(
            FIELD_DATA,
            &record.data.as_deref().map(|data| STANDARD.encode(data)),
        )?;
        node.serialize_field(FIELD_ACLS, &EncodedAcls(record))?;
        node.end()
    }
}

struct EncodedAcls<'a>(&'a NodeRecord);

impl Serialize for EncodedAcls<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let acls = &self.0.acls;
        let mut seq = serializer.serialize_seq(Some(acls.len()))?;
        for acl in acls {
            seq.serialize_element(&AclEntry::from(acl))?;
        }
        seq.end()
    }
}
