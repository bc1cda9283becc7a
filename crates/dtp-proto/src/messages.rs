//! Protobuf messages of the block-read exchange.
//!
//! Field numbers and types follow the datanode's `datatransfer.proto` and
//! `hdfs.proto` schemas (proto2). Only the messages and fields a reader needs
//! are declared; unknown fields sent by newer servers are skipped on decode.

/// Identity of a block as the datanode knows it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExtendedBlockProto {
    #[prost(string, required, tag = "1")]
    pub pool_id: ::prost::alloc::string::String,
    #[prost(uint64, required, tag = "2")]
    pub block_id: u64,
    #[prost(uint64, required, tag = "3")]
    pub generation_stamp: u64,
    #[prost(uint64, optional, tag = "4", default = "0")]
    pub num_bytes: ::core::option::Option<u64>,
}

/// Opaque security token.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokenProto {
    #[prost(bytes = "vec", required, tag = "1")]
    pub identifier: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", required, tag = "2")]
    pub password: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, required, tag = "3")]
    pub kind: ::prost::alloc::string::String,
    #[prost(string, required, tag = "4")]
    pub service: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BaseHeaderProto {
    #[prost(message, required, tag = "1")]
    pub block: ExtendedBlockProto,
    #[prost(message, optional, tag = "2")]
    pub token: ::core::option::Option<TokenProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientOperationHeaderProto {
    #[prost(message, required, tag = "1")]
    pub base_header: BaseHeaderProto,
    #[prost(string, required, tag = "2")]
    pub client_name: ::prost::alloc::string::String,
}

/// Request body of op `0x51`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpReadBlockProto {
    #[prost(message, required, tag = "1")]
    pub header: ClientOperationHeaderProto,
    #[prost(uint64, required, tag = "2")]
    pub offset: u64,
    #[prost(uint64, required, tag = "3")]
    pub len: u64,
    #[prost(bool, optional, tag = "4", default = "true")]
    pub send_checksums: ::core::option::Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChecksumTypeProto {
    ChecksumNull = 0,
    ChecksumCrc32 = 1,
    ChecksumCrc32c = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChecksumProto {
    #[prost(enumeration = "ChecksumTypeProto", required, tag = "1")]
    pub r#type: i32,
    #[prost(uint32, required, tag = "2")]
    pub bytes_per_checksum: u32,
}

/// Checksum parameters of a read, plus where the chunk stream starts.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadOpChecksumInfoProto {
    #[prost(message, required, tag = "1")]
    pub checksum: ChecksumProto,
    /// Block offset of the first chunk sent; a multiple of
    /// `bytes_per_checksum`, at or before the requested offset.
    #[prost(uint64, required, tag = "2")]
    pub chunk_offset: u64,
}

/// Status codes shared by responses and client acknowledgements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    Error = 1,
    ErrorChecksum = 2,
    ErrorInvalid = 3,
    ErrorExists = 4,
    ErrorAccessToken = 5,
    ChecksumOk = 6,
    ErrorUnsupported = 7,
    OobRestart = 8,
    OobReserved1 = 9,
    OobReserved2 = 10,
    OobReserved3 = 11,
    InProgress = 12,
    ErrorBlockPinned = 13,
}

/// First message a datanode sends back for any block op.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockOpResponseProto {
    #[prost(enumeration = "Status", required, tag = "1")]
    pub status: i32,
    #[prost(string, optional, tag = "2")]
    pub first_bad_link: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "4")]
    pub read_op_checksum_info: ::core::option::Option<ReadOpChecksumInfoProto>,
    #[prost(string, optional, tag = "5")]
    pub message: ::core::option::Option<::prost::alloc::string::String>,
}

/// Header of one data packet.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PacketHeaderProto {
    #[prost(sfixed64, required, tag = "1")]
    pub offset_in_block: i64,
    #[prost(sfixed64, required, tag = "2")]
    pub seqno: i64,
    #[prost(bool, required, tag = "3")]
    pub last_packet_in_block: bool,
    #[prost(sfixed32, required, tag = "4")]
    pub data_len: i32,
    #[prost(bool, optional, tag = "5", default = "false")]
    pub sync_block: ::core::option::Option<bool>,
}

/// Sent by the client after it has read and verified a whole range.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientReadStatusProto {
    #[prost(enumeration = "Status", required, tag = "1")]
    pub status: i32,
}
