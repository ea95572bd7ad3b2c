//! Protocol constants

/// Frame start magic
pub const PREFIX_MAGIC: u32 = 0x0000_55AA;

/// Frame end magic
pub const SUFFIX_MAGIC: u32 = 0x0000_AA55;

/// Magic, sequence word, command word, length word
pub const HEADER_SIZE: usize = 16;

/// CRC word plus suffix magic
pub const TRAILER_SIZE: usize = 8;

/// Return code word present in device-originated frames
pub const RETURN_CODE_SIZE: usize = 4;

/// Only the low byte of the length word is ever populated
pub const MAX_FRAME_LENGTH: usize = 0xFF;

/// `"3.3"` followed by twelve zero bytes
pub const VERSION_HEADER_SIZE: usize = 15;

/// Signature region following `"3.1"` in device replies
pub const V31_SIGNATURE_SIZE: usize = 16;

/// Default TCP port for device sessions
pub const DEFAULT_PORT: u16 = 6668;

/// Broadcast port for v3.1 devices
pub const LEGACY_DISCOVERY_PORT: u16 = 6666;

/// Broadcast port for encrypted v3.3 devices
pub const DISCOVERY_PORT: u16 = 6667;

/// Seed whose MD5 digest keys the discovery broadcasts
pub const UDP_KEY_SEED: &[u8; 16] = b"yGAdlopoPVldABfn";

/// Default connection timeout (seconds)
pub const DEFAULT_TIMEOUT: u64 = 10;

/// Maximum retries for network operations
pub const MAX_RETRIES: u32 = 5;

/// Backoff between retries and before a supplementary read (milliseconds)
pub const RETRY_BACKOFF_MS: u64 = 100;

/// Responses shorter than this trigger one supplementary read
pub const SHORT_READ_THRESHOLD: usize = 40;

/// TCP receive buffer
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Discovery receive buffer
pub const DISCOVERY_BUFFER_SIZE: usize = 4048;

/// Scan attempts before giving up
pub const DISCOVERY_MAX_RETRIES: u32 = 15;

/// Seconds to wait for a broadcast
pub const DISCOVERY_TIMEOUT: u64 = 3;

/// Wire opcodes
pub mod opcodes {
    pub const UDP: u8 = 0x00;
    pub const AP_CONFIG: u8 = 0x01;
    pub const ACTIVE: u8 = 0x02;
    pub const BIND: u8 = 0x03;
    pub const RENAME_GW: u8 = 0x04;
    pub const RENAME_DEVICE: u8 = 0x05;
    pub const UNBIND: u8 = 0x06;
    pub const CONTROL: u8 = 0x07;
    pub const STATUS: u8 = 0x08;
    pub const HEART_BEAT: u8 = 0x09;
    pub const DP_QUERY: u8 = 0x0A;
    pub const QUERY_WIFI: u8 = 0x0B;
    pub const TOKEN_BIND: u8 = 0x0C;
    pub const CONTROL_NEW: u8 = 0x0D;
    pub const ENABLE_WIFI: u8 = 0x0E;

    /// Opcode the reference command table sends for new-style data point queries
    pub const DP_QUERY_NEW_REQUEST: u8 = 0x0F;

    pub const DP_QUERY_NEW: u8 = 0x10;
    pub const SCENE_EXECUTE: u8 = 0x11;
    pub const UDP_NEW: u8 = 0x13;
    pub const AP_CONFIG_NEW: u8 = 0x14;
    pub const LAN_GW_ACTIVE: u8 = 0xF0;
    pub const LAN_SUB_DEV_REQUEST: u8 = 0xF1;
    pub const LAN_DELETE_SUB_DEV: u8 = 0xF2;
    pub const LAN_REPORT_SUB_DEV: u8 = 0xF3;
    pub const LAN_SCENE: u8 = 0xF4;
    pub const LAN_PUBLISH_CLOUD_CONFIG: u8 = 0xF5;
    pub const LAN_PUBLISH_APP_CONFIG: u8 = 0xF6;
    pub const LAN_EXPORT_APP_CONFIG: u8 = 0xF7;
    pub const LAN_PUBLISH_SCENE_PANEL: u8 = 0xF8;
    pub const LAN_REMOVE_GW: u8 = 0xF9;
    pub const LAN_CHECK_GW_UPDATE: u8 = 0xFA;
    pub const LAN_GW_UPDATE: u8 = 0xFB;
    pub const LAN_SET_GW_CHANNEL: u8 = 0xFC;

    /// Get opcode name for logging
    pub fn name(opcode: u8) -> &'static str {
        match opcode {
            UDP => "UDP",
            AP_CONFIG => "AP_CONFIG",
            ACTIVE => "ACTIVE",
            BIND => "BIND",
            RENAME_GW => "RENAME_GW",
            RENAME_DEVICE => "RENAME_DEVICE",
            UNBIND => "UNBIND",
            CONTROL => "CONTROL",
            STATUS => "STATUS",
            HEART_BEAT => "HEART_BEAT",
            DP_QUERY => "DP_QUERY",
            QUERY_WIFI => "QUERY_WIFI",
            TOKEN_BIND => "TOKEN_BIND",
            CONTROL_NEW => "CONTROL_NEW",
            ENABLE_WIFI => "ENABLE_WIFI",
            DP_QUERY_NEW_REQUEST | DP_QUERY_NEW => "DP_QUERY_NEW",
            SCENE_EXECUTE => "SCENE_EXECUTE",
            UDP_NEW => "UDP_NEW",
            AP_CONFIG_NEW => "AP_CONFIG_NEW",
            LAN_GW_ACTIVE => "LAN_GW_ACTIVE",
            LAN_SUB_DEV_REQUEST => "LAN_SUB_DEV_REQUEST",
            LAN_DELETE_SUB_DEV => "LAN_DELETE_SUB_DEV",
            LAN_REPORT_SUB_DEV => "LAN_REPORT_SUB_DEV",
            LAN_SCENE => "LAN_SCENE",
            LAN_PUBLISH_CLOUD_CONFIG => "LAN_PUBLISH_CLOUD_CONFIG",
            LAN_PUBLISH_APP_CONFIG => "LAN_PUBLISH_APP_CONFIG",
            LAN_EXPORT_APP_CONFIG => "LAN_EXPORT_APP_CONFIG",
            LAN_PUBLISH_SCENE_PANEL => "LAN_PUBLISH_SCENE_PANEL",
            LAN_REMOVE_GW => "LAN_REMOVE_GW",
            LAN_CHECK_GW_UPDATE => "LAN_CHECK_GW_UPDATE",
            LAN_GW_UPDATE => "LAN_GW_UPDATE",
            LAN_SET_GW_CHANNEL => "LAN_SET_GW_CHANNEL",
            _ => "UNKNOWN",
        }
    }
}
