//! Messages implemented the way generated code implements them.
//!
//! `Scalars` and `Inner` follow proto3 rules (zero values are omitted),
//! `Legacy` follows proto2 rules (present optional and required fields are
//! always written) and declares an extension range, and `Node` is
//! self-recursive.

#![allow(dead_code)]

use std::ops::RangeInclusive;

use lazypb::bytes::{Buf, BufMut};
use lazypb::encoding::{
    self, double, fixed32, fixed64, int32, int64, message, sint32, sint64, string, uint64,
    DecodeContext, WireType,
};
use lazypb::{
    merge_variant, DecodeError, Extendable, Extensions, Message, Oneof, SizeCache, UnknownFields,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Encodes `msg`, decodes it back and checks that nothing changed.
pub fn check_message<M>(msg: &M)
where
    M: Message + Default + PartialEq + std::fmt::Debug,
{
    let expected_len = msg.size();

    let buf = msg.marshal();
    assert_eq!(expected_len, buf.len());

    let mut roundtrip = M::default();
    roundtrip.unmarshal(buf.as_slice()).unwrap();
    assert_eq!(msg, &roundtrip);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inner {
    pub id: i64,
    pub tags: Vec<u64>,
    pub size_cache: SizeCache,
}

impl Message for Inner {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if self.id != 0 {
            int64::encode(1, &self.id, buf);
        }
        fixed64::encode_packed(2, &self.tags, buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        const STRUCT_NAME: &str = "Inner";
        match tag {
            1 => int64::merge(wire_type, &mut self.id, buf, ctx).map_err(|mut error| {
                error.push(STRUCT_NAME, "id", tag);
                error
            }),
            2 => fixed64::merge_repeated(wire_type, &mut self.tags, buf, ctx).map_err(
                |mut error| {
                    error.push(STRUCT_NAME, "tags", tag);
                    error
                },
            ),
            _ => encoding::skip_field(wire_type, buf),
        }
    }

    fn encoded_len(&self) -> usize {
        (if self.id != 0 {
            int64::encoded_len(1, &self.id)
        } else {
            0
        }) + fixed64::encoded_len_packed(2, &self.tags)
    }

    fn clear(&mut self) {
        self.id = 0;
        self.tags.clear();
        self.size_cache.reset();
    }

    fn size_cache(&self) -> Option<&SizeCache> {
        Some(&self.size_cache)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Choice {
    Number(u64),
    Text(String),
    Detail(Inner),
}

impl Oneof for Choice {
    const TAGS: &'static [u32] = &[12, 13, 14];

    fn encode(&self, buf: &mut impl BufMut) {
        match self {
            Choice::Number(value) => uint64::encode(12, value, buf),
            Choice::Text(value) => string::encode(13, value, buf),
            Choice::Detail(value) => message::encode(14, value, buf),
        }
    }

    fn merge(
        field: &mut Option<Self>,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            12 => merge_variant(
                field,
                |choice| match choice {
                    Choice::Number(value) => Some(value),
                    _ => None,
                },
                Choice::Number,
                |value| uint64::merge(wire_type, value, buf, ctx),
            ),
            13 => merge_variant(
                field,
                |choice| match choice {
                    Choice::Text(value) => Some(value),
                    _ => None,
                },
                Choice::Text,
                |value| string::merge(wire_type, value, buf, ctx),
            ),
            14 => merge_variant(
                field,
                |choice| match choice {
                    Choice::Detail(value) => Some(value),
                    _ => None,
                },
                Choice::Detail,
                |value| message::merge(wire_type, value, buf, ctx),
            ),
            _ => unreachable!("invalid Choice tag: {}", tag),
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            Choice::Number(value) => uint64::encoded_len(12, value),
            Choice::Text(value) => string::encoded_len(13, value),
            Choice::Detail(value) => message::encoded_len(14, value),
        }
    }

    fn tag(&self) -> u32 {
        match self {
            Choice::Number(_) => 12,
            Choice::Text(_) => 13,
            Choice::Detail(_) => 14,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scalars {
    pub count: i32,
    pub delta: i64,
    pub name: String,
    pub payload: Vec<u8>,
    pub ratio: f64,
    pub flag: bool,
    pub checksum: u32,
    pub samples: Vec<i32>,
    pub labels: Vec<String>,
    pub inner: Option<Inner>,
    pub children: Vec<Inner>,
    pub choice: Option<Choice>,
    pub unknown: UnknownFields,
    pub size_cache: SizeCache,
}

impl Message for Scalars {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if self.count != 0 {
            int32::encode(1, &self.count, buf);
        }
        if self.delta != 0 {
            sint64::encode(2, &self.delta, buf);
        }
        if !self.name.is_empty() {
            string::encode(3, &self.name, buf);
        }
        if !self.payload.is_empty() {
            encoding::bytes::encode(4, &self.payload, buf);
        }
        if self.ratio != 0.0 {
            double::encode(5, &self.ratio, buf);
        }
        if self.flag {
            encoding::bool::encode(6, &self.flag, buf);
        }
        if self.checksum != 0 {
            fixed32::encode(7, &self.checksum, buf);
        }
        int32::encode_packed(8, &self.samples, buf);
        string::encode_repeated(9, &self.labels, buf);
        if let Some(ref msg) = self.inner {
            message::encode(10, msg, buf);
        }
        message::encode_repeated(11, &self.children, buf);
        if let Some(ref oneof) = self.choice {
            oneof.encode(buf);
        }
        self.unknown.encode_raw(buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        const STRUCT_NAME: &str = "Scalars";
        let (field, result) = match tag {
            1 => ("count", int32::merge(wire_type, &mut self.count, buf, ctx)),
            2 => ("delta", sint64::merge(wire_type, &mut self.delta, buf, ctx)),
            3 => ("name", string::merge(wire_type, &mut self.name, buf, ctx)),
            4 => ("payload", encoding::bytes::merge(wire_type, &mut self.payload, buf, ctx)),
            5 => ("ratio", double::merge(wire_type, &mut self.ratio, buf, ctx)),
            6 => ("flag", encoding::bool::merge(wire_type, &mut self.flag, buf, ctx)),
            7 => ("checksum", fixed32::merge(wire_type, &mut self.checksum, buf, ctx)),
            8 => (
                "samples",
                int32::merge_repeated(wire_type, &mut self.samples, buf, ctx),
            ),
            9 => (
                "labels",
                string::merge_repeated(wire_type, &mut self.labels, buf, ctx),
            ),
            10 => (
                "inner",
                message::merge(
                    wire_type,
                    self.inner.get_or_insert_with(Default::default),
                    buf,
                    ctx,
                ),
            ),
            11 => (
                "children",
                message::merge_repeated(wire_type, &mut self.children, buf, ctx),
            ),
            12 | 13 | 14 => (
                "choice",
                Choice::merge(&mut self.choice, tag, wire_type, buf, ctx),
            ),
            _ => return self.unknown.merge_field(tag, wire_type, buf, ctx),
        };
        result.map_err(|mut error| {
            error.push(STRUCT_NAME, field, tag);
            error
        })
    }

    fn encoded_len(&self) -> usize {
        (if self.count != 0 {
            int32::encoded_len(1, &self.count)
        } else {
            0
        }) + (if self.delta != 0 {
            sint64::encoded_len(2, &self.delta)
        } else {
            0
        }) + (if !self.name.is_empty() {
            string::encoded_len(3, &self.name)
        } else {
            0
        }) + (if !self.payload.is_empty() {
            encoding::bytes::encoded_len(4, &self.payload)
        } else {
            0
        }) + (if self.ratio != 0.0 {
            double::encoded_len(5, &self.ratio)
        } else {
            0
        }) + (if self.flag {
            encoding::bool::encoded_len(6, &self.flag)
        } else {
            0
        }) + (if self.checksum != 0 {
            fixed32::encoded_len(7, &self.checksum)
        } else {
            0
        }) + int32::encoded_len_packed(8, &self.samples)
            + string::encoded_len_repeated(9, &self.labels)
            + self
                .inner
                .as_ref()
                .map_or(0, |msg| message::encoded_len(10, msg))
            + message::encoded_len_repeated(11, &self.children)
            + self.choice.as_ref().map_or(0, Choice::encoded_len)
            + self.unknown.encoded_len()
    }

    fn clear(&mut self) {
        *self = Scalars::default();
    }

    fn size_cache(&self) -> Option<&SizeCache> {
        Some(&self.size_cache)
    }
}

/// A proto2 message with explicit presence and an extension range.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Legacy {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub values: Vec<i32>,
    pub kind: i32,
    pub extensions: Extensions,
    pub unknown: UnknownFields,
}

impl Message for Legacy {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if let Some(ref value) = self.id {
            int32::encode(1, value, buf);
        }
        if let Some(ref value) = self.name {
            string::encode(2, value, buf);
        }
        sint32::encode_repeated(3, &self.values, buf);
        int32::encode(4, &self.kind, buf);
        self.extensions.encode_raw(buf);
        self.unknown.encode_raw(buf);
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        const STRUCT_NAME: &str = "Legacy";
        let (field, result) = match tag {
            1 => (
                "id",
                int32::merge(
                    wire_type,
                    self.id.get_or_insert_with(Default::default),
                    buf,
                    ctx,
                ),
            ),
            2 => (
                "name",
                string::merge(
                    wire_type,
                    self.name.get_or_insert_with(Default::default),
                    buf,
                    ctx,
                ),
            ),
            3 => (
                "values",
                sint32::merge_repeated(wire_type, &mut self.values, buf, ctx),
            ),
            4 => ("kind", int32::merge(wire_type, &mut self.kind, buf, ctx)),
            _ if Self::is_extension(tag) => {
                return self.extensions.merge_field(tag, wire_type, buf, ctx);
            }
            _ => return self.unknown.merge_field(tag, wire_type, buf, ctx),
        };
        result.map_err(|mut error| {
            error.push(STRUCT_NAME, field, tag);
            error
        })
    }

    fn encoded_len(&self) -> usize {
        self.id.as_ref().map_or(0, |value| int32::encoded_len(1, value))
            + self
                .name
                .as_ref()
                .map_or(0, |value| string::encoded_len(2, value))
            + sint32::encoded_len_repeated(3, &self.values)
            + int32::encoded_len(4, &self.kind)
            + self.extensions.encoded_len()
            + self.unknown.encoded_len()
    }

    fn clear(&mut self) {
        *self = Legacy::default();
    }
}

impl Extendable for Legacy {
    const MESSAGE_NAME: &'static str = "test.Legacy";
    const EXTENSION_RANGES: &'static [RangeInclusive<u32>] = &[100..=199];

    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// A self-recursive message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub value: u64,
    pub child: Option<Box<Node>>,
}

impl Node {
    /// A chain of `depth` nodes.
    pub fn chain(depth: u64) -> Node {
        let mut node = Node {
            value: depth,
            child: None,
        };
        for value in (1..depth).rev() {
            node = Node {
                value,
                child: Some(Box::new(node)),
            };
        }
        node
    }

    pub fn depth(&self) -> u64 {
        1 + self.child.as_ref().map_or(0, |child| child.depth())
    }
}

impl Message for Node {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if self.value != 0 {
            uint64::encode(1, &self.value, buf);
        }
        if let Some(ref child) = self.child {
            message::encode(2, child, buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        const STRUCT_NAME: &str = "Node";
        match tag {
            1 => uint64::merge(wire_type, &mut self.value, buf, ctx).map_err(|mut error| {
                error.push(STRUCT_NAME, "value", tag);
                error
            }),
            2 => message::merge(
                wire_type,
                self.child.get_or_insert_with(Default::default),
                buf,
                ctx,
            )
            .map_err(|mut error| {
                error.push(STRUCT_NAME, "child", tag);
                error
            }),
            _ => encoding::skip_field(wire_type, buf),
        }
    }

    fn encoded_len(&self) -> usize {
        (if self.value != 0 {
            uint64::encoded_len(1, &self.value)
        } else {
            0
        }) + self
            .child
            .as_ref()
            .map_or(0, |child| message::encoded_len(2, child))
    }

    fn clear(&mut self) {
        self.value = 0;
        self.child = None;
    }
}

/// A populated `Scalars` exercising every field kind.
pub fn sample() -> Scalars {
    Scalars {
        count: -42,
        delta: -7_000_000_000,
        name: "sample".to_string(),
        payload: vec![0, 1, 2, 0xFF],
        ratio: 0.25,
        flag: true,
        checksum: 0xDEAD_BEEF,
        samples: vec![1, -1, 300],
        labels: vec!["a".to_string(), String::new(), "ccc".to_string()],
        inner: Some(Inner {
            id: 9,
            tags: vec![1, u64::MAX],
            ..Default::default()
        }),
        children: vec![
            Inner::default(),
            Inner {
                id: -3,
                ..Default::default()
            },
        ],
        choice: Some(Choice::Text("picked".to_string())),
        ..Default::default()
    }
}
