//! Wire encoding for message payloads carried inside a [`crate::frame::Frame`].
//!
//! Payloads are not actual protocol-buffer wire format; they're a hand-rolled
//! tag/length/value encoding in the same spirit as the record encoding used for on-disk
//! storage elsewhere in this codebase: `tag(u8) | len(u32 LE) | bytes`, repeated. Unknown tags
//! are skipped rather than rejected, so a client speaking a newer or older field set than the
//! server still decodes the fields it recognizes.

use crate::engine::RankUnit;
use crate::error::MessageError;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    GetRequest = 1,
    GetResponse = 2,
    GetByRankRequest = 3,
    GetByRankResponse = 4,
    GetRangeRequest = 5,
    GetRangeResponse = 6,
    UpdateRequest = 7,
    UpdateResponse = 8,
    DeleteRequest = 9,
    DeleteResponse = 10,
}

impl MessageType {
    pub fn from_u32(v: u32) -> Result<Self, MessageError> {
        Ok(match v {
            1 => Self::GetRequest,
            2 => Self::GetResponse,
            3 => Self::GetByRankRequest,
            4 => Self::GetByRankResponse,
            5 => Self::GetRangeRequest,
            6 => Self::GetRangeResponse,
            7 => Self::UpdateRequest,
            8 => Self::UpdateResponse,
            9 => Self::DeleteRequest,
            10 => Self::DeleteResponse,
            other => return Err(MessageError::UnknownPayloadType(other)),
        })
    }
}

// Field tags. Reused across message types; a tag only needs to be unique within one message.
const TAG_RANK: u8 = 1;
const TAG_ID: u8 = 2;
const TAG_KEY: u8 = 3;
const TAG_VALUE: u8 = 4;
const TAG_POS: u8 = 5;
const TAG_START: u8 = 6;
const TAG_NUM: u8 = 7;
const TAG_REPLY: u8 = 8;
const TAG_LAST_DATA: u8 = 9;
const TAG_BYPASS_NO_UPDATE: u8 = 10;
const TAG_TIME_BEGIN: u8 = 11;
const TAG_TIME_END: u8 = 12;
const TAG_UNIT: u8 = 13;
const TAG_LAST_POS: u8 = 14;
const TAG_TOTAL: u8 = 15;
const TAG_UNITS: u8 = 16;

fn put_field(buf: &mut Vec<u8>, tag: u8, bytes: &[u8]) {
    buf.push(tag);
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn put_u32(buf: &mut Vec<u8>, tag: u8, v: u32) {
    put_field(buf, tag, &v.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, tag: u8, v: u64) {
    put_field(buf, tag, &v.to_le_bytes());
}

fn put_bool(buf: &mut Vec<u8>, tag: u8, v: bool) {
    put_field(buf, tag, &[v as u8]);
}

fn put_bytes(buf: &mut Vec<u8>, tag: u8, v: &[u8]) {
    put_field(buf, tag, v);
}

/// Parses a TLV-encoded buffer into its raw fields, in the order they appear. Repeated tags
/// (e.g. a list of nested units) keep every occurrence.
fn decode_fields(buf: &[u8]) -> Result<Vec<(u8, &[u8])>, MessageError> {
    let mut fields = Vec::new();
    let mut i = 0;
    while i < buf.len() {
        if i + 5 > buf.len() {
            return Err(MessageError::Truncated);
        }
        let tag = buf[i];
        let len = u32::from_le_bytes(buf[i + 1..i + 5].try_into().unwrap()) as usize;
        let start = i + 5;
        let end = start
            .checked_add(len)
            .ok_or(MessageError::InvalidLength("field"))?;
        if end > buf.len() {
            return Err(MessageError::Truncated);
        }
        fields.push((tag, &buf[start..end]));
        i = end;
    }
    Ok(fields)
}

fn find_u32(fields: &[(u8, &[u8])], tag: u8) -> Option<u32> {
    fields
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, v)| u32::from_le_bytes(v[..4].try_into().unwrap_or([0; 4])))
}

fn find_u64(fields: &[(u8, &[u8])], tag: u8) -> Option<u64> {
    fields
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, v)| u64::from_le_bytes(v[..8].try_into().unwrap_or([0; 8])))
}

fn find_bool(fields: &[(u8, &[u8])], tag: u8) -> bool {
    fields
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, v)| v.first().copied().unwrap_or(0) != 0)
        .unwrap_or(false)
}

fn find_bytes(fields: &[(u8, &[u8])], tag: u8) -> Vec<u8> {
    fields
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, v)| v.to_vec())
        .unwrap_or_default()
}

fn encode_rank_unit(u: &RankUnit) -> Vec<u8> {
    let mut buf = Vec::new();
    put_u64(&mut buf, TAG_ID, u.id);
    put_u64(&mut buf, TAG_KEY, u.key);
    put_bytes(&mut buf, TAG_VALUE, &u.value);
    buf
}

fn decode_rank_unit(bytes: &[u8]) -> Result<RankUnit, MessageError> {
    let fields = decode_fields(bytes)?;
    Ok(RankUnit {
        id: find_u64(&fields, TAG_ID).unwrap_or(0),
        key: find_u64(&fields, TAG_KEY).unwrap_or(0),
        value: find_bytes(&fields, TAG_VALUE),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub rank: u32,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponse {
    pub rank: u32,
    pub pos: u32,
    pub data: RankUnit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetByRankRequest {
    pub rank: u32,
    pub pos: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetByRankResponse {
    pub rank: u32,
    pub pos: u32,
    pub data: RankUnit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRangeRequest {
    pub rank: u32,
    pub start: u32,
    pub num: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRangeResponse {
    pub rank: u32,
    pub total: u32,
    pub data: Vec<RankUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub rank: u32,
    pub data: RankUnit,
    pub reply: bool,
    pub last_data: bool,
    pub bypass_no_update_period: bool,
    pub time_begin: u64,
    pub time_end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateResponse {
    pub rank: u32,
    pub last_pos: u32,
    pub pos: u32,
    pub data: Option<RankUnit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub rank: u32,
    pub id: u64,
    pub reply: bool,
    pub last_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteResponse {
    pub rank: u32,
    pub last_pos: u32,
    pub data: Option<RankUnit>,
}

/// A decoded request, still tagged with the rank id every request variant carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get(GetRequest),
    GetByRank(GetByRankRequest),
    GetRange(GetRangeRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
}

impl Request {
    pub fn rank(&self) -> u32 {
        match self {
            Request::Get(m) => m.rank,
            Request::GetByRank(m) => m.rank,
            Request::GetRange(m) => m.rank,
            Request::Update(m) => m.rank,
            Request::Delete(m) => m.rank,
        }
    }

    /// The [`MessageType`] this request should be framed with.
    pub fn payload_type(&self) -> MessageType {
        match self {
            Request::Get(_) => MessageType::GetRequest,
            Request::GetByRank(_) => MessageType::GetByRankRequest,
            Request::GetRange(_) => MessageType::GetRangeRequest,
            Request::Update(_) => MessageType::UpdateRequest,
            Request::Delete(_) => MessageType::DeleteRequest,
        }
    }

    /// Encodes this request's fields as a TLV payload, the counterpart to [`Request::decode`].
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Request::Get(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u64(&mut buf, TAG_ID, r.id);
            }
            Request::GetByRank(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u32(&mut buf, TAG_POS, r.pos);
            }
            Request::GetRange(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u32(&mut buf, TAG_START, r.start);
                put_u32(&mut buf, TAG_NUM, r.num);
            }
            Request::Update(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_bytes(&mut buf, TAG_UNIT, &encode_rank_unit(&r.data));
                put_bool(&mut buf, TAG_REPLY, r.reply);
                put_bool(&mut buf, TAG_LAST_DATA, r.last_data);
                put_bool(&mut buf, TAG_BYPASS_NO_UPDATE, r.bypass_no_update_period);
                put_u64(&mut buf, TAG_TIME_BEGIN, r.time_begin);
                put_u64(&mut buf, TAG_TIME_END, r.time_end);
            }
            Request::Delete(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u64(&mut buf, TAG_ID, r.id);
                put_bool(&mut buf, TAG_REPLY, r.reply);
                put_bool(&mut buf, TAG_LAST_DATA, r.last_data);
            }
        }
        buf
    }

    pub fn decode(payload_type: u32, payload: &[u8]) -> Result<Self, MessageError> {
        let fields = decode_fields(payload)?;
        let rank = find_u32(&fields, TAG_RANK).ok_or(MessageError::MissingField("rank"))?;
        Ok(match MessageType::from_u32(payload_type)? {
            MessageType::GetRequest => Request::Get(GetRequest {
                rank,
                id: find_u64(&fields, TAG_ID).unwrap_or(0),
            }),
            MessageType::GetByRankRequest => Request::GetByRank(GetByRankRequest {
                rank,
                pos: find_u32(&fields, TAG_POS).unwrap_or(0),
            }),
            MessageType::GetRangeRequest => Request::GetRange(GetRangeRequest {
                rank,
                start: find_u32(&fields, TAG_START).unwrap_or(0),
                num: find_u32(&fields, TAG_NUM).unwrap_or(0),
            }),
            MessageType::UpdateRequest => {
                let unit_bytes = fields
                    .iter()
                    .find(|(t, _)| *t == TAG_UNIT)
                    .map(|(_, v)| *v)
                    .ok_or(MessageError::MissingField("data"))?;
                Request::Update(UpdateRequest {
                    rank,
                    data: decode_rank_unit(unit_bytes)?,
                    reply: find_bool(&fields, TAG_REPLY),
                    last_data: find_bool(&fields, TAG_LAST_DATA),
                    bypass_no_update_period: find_bool(&fields, TAG_BYPASS_NO_UPDATE),
                    time_begin: find_u64(&fields, TAG_TIME_BEGIN).unwrap_or(0),
                    time_end: find_u64(&fields, TAG_TIME_END).unwrap_or(0),
                })
            }
            MessageType::DeleteRequest => Request::Delete(DeleteRequest {
                rank,
                id: find_u64(&fields, TAG_ID).unwrap_or(0),
                reply: find_bool(&fields, TAG_REPLY),
                last_data: find_bool(&fields, TAG_LAST_DATA),
            }),
            other => return Err(MessageError::UnknownPayloadType(other as u32)),
        })
    }
}

/// A response ready to be marshaled into a reply frame's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Get(GetResponse),
    GetByRank(GetByRankResponse),
    GetRange(GetRangeResponse),
    Update(UpdateResponse),
    Delete(DeleteResponse),
}

impl Response {
    pub fn payload_type(&self) -> MessageType {
        match self {
            Response::Get(_) => MessageType::GetResponse,
            Response::GetByRank(_) => MessageType::GetByRankResponse,
            Response::GetRange(_) => MessageType::GetRangeResponse,
            Response::Update(_) => MessageType::UpdateResponse,
            Response::Delete(_) => MessageType::DeleteResponse,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Response::Get(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u32(&mut buf, TAG_POS, r.pos);
                put_bytes(&mut buf, TAG_UNIT, &encode_rank_unit(&r.data));
            }
            Response::GetByRank(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u32(&mut buf, TAG_POS, r.pos);
                put_bytes(&mut buf, TAG_UNIT, &encode_rank_unit(&r.data));
            }
            Response::GetRange(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u32(&mut buf, TAG_TOTAL, r.total);
                for unit in &r.data {
                    put_bytes(&mut buf, TAG_UNITS, &encode_rank_unit(unit));
                }
            }
            Response::Update(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u32(&mut buf, TAG_LAST_POS, r.last_pos);
                put_u32(&mut buf, TAG_POS, r.pos);
                if let Some(data) = &r.data {
                    put_bytes(&mut buf, TAG_UNIT, &encode_rank_unit(data));
                }
            }
            Response::Delete(r) => {
                put_u32(&mut buf, TAG_RANK, r.rank);
                put_u32(&mut buf, TAG_LAST_POS, r.last_pos);
                if let Some(data) = &r.data {
                    put_bytes(&mut buf, TAG_UNIT, &encode_rank_unit(data));
                }
            }
        }
        buf
    }

    pub fn decode(payload_type: u32, payload: &[u8]) -> Result<Self, MessageError> {
        let fields = decode_fields(payload)?;
        let rank = find_u32(&fields, TAG_RANK).ok_or(MessageError::MissingField("rank"))?;
        Ok(match MessageType::from_u32(payload_type)? {
            MessageType::GetResponse => Response::Get(GetResponse {
                rank,
                pos: find_u32(&fields, TAG_POS).unwrap_or(0),
                data: decode_optional_unit(&fields)?.unwrap_or_default(),
            }),
            MessageType::GetByRankResponse => Response::GetByRank(GetByRankResponse {
                rank,
                pos: find_u32(&fields, TAG_POS).unwrap_or(0),
                data: decode_optional_unit(&fields)?.unwrap_or_default(),
            }),
            MessageType::GetRangeResponse => {
                let mut data = Vec::new();
                for (tag, bytes) in &fields {
                    if *tag == TAG_UNITS {
                        data.push(decode_rank_unit(bytes)?);
                    }
                }
                Response::GetRange(GetRangeResponse {
                    rank,
                    total: find_u32(&fields, TAG_TOTAL).unwrap_or(0),
                    data,
                })
            }
            MessageType::UpdateResponse => Response::Update(UpdateResponse {
                rank,
                last_pos: find_u32(&fields, TAG_LAST_POS).unwrap_or(0),
                pos: find_u32(&fields, TAG_POS).unwrap_or(0),
                data: decode_optional_unit(&fields)?,
            }),
            MessageType::DeleteResponse => Response::Delete(DeleteResponse {
                rank,
                last_pos: find_u32(&fields, TAG_LAST_POS).unwrap_or(0),
                data: decode_optional_unit(&fields)?,
            }),
            other => return Err(MessageError::UnknownPayloadType(other as u32)),
        })
    }
}

fn decode_optional_unit(fields: &[(u8, &[u8])]) -> Result<Option<RankUnit>, MessageError> {
    match fields.iter().find(|(t, _)| *t == TAG_UNIT) {
        Some((_, bytes)) => Ok(Some(decode_rank_unit(bytes)?)),
        None => Ok(None),
    }
}
