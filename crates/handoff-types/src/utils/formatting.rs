//! String helpers for log lines and config parsing.

/// Shortens a hex id to its first 10 characters (prefix plus 4 bytes) followed by "..".
pub fn truncate_id(id: &str) -> String {
	match id.get(..10) {
		Some(head) if id.len() > 10 => format!("{}..", head),
		_ => id.to_string(),
	}
}

/// Strips a leading "0x" or "0X" if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}
