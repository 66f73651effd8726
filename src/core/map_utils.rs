//! Map ID utilities
//!
//! Gen-3 maps are addressed by a (map group, map number) byte pair.

/// Format a map pair as "Map GG.NN" for maps without a display name
///
/// # Examples
///
/// ```
/// use gba_state_reader::core::map_utils::format_map_label;
///
/// assert_eq!(format_map_label(1, 4), "Map 01.04");
/// ```
pub fn format_map_label(map_bank: u8, map_id: u8) -> String {
    format!("Map {:02}.{:02}", map_bank, map_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_map_label() {
        assert_eq!(format_map_label(0, 0), "Map 00.00");
        assert_eq!(format_map_label(25, 40), "Map 25.40");
        assert_eq!(format_map_label(255, 255), "Map 255.255");
    }
}
