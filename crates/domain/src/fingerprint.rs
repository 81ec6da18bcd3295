use serde_json::Value;
use sha2::{Digest, Sha256};

/// 计算原始厂商对象的指纹
///
/// 对键排序后的规范 JSON 序列化结果做 SHA-256，字节相同的原始对象必然得到相同指纹，
/// 与字段在原始响应中的顺序无关。
pub fn fingerprint(raw: &Value) -> String {
    let canonical = serde_json::to_vec(raw).unwrap_or_default();
    format!("{:x}", Sha256::digest(&canonical))
}
