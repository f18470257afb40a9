use goblin::pe::characteristic::{
    IMAGE_FILE_32BIT_MACHINE, IMAGE_FILE_DEBUG_STRIPPED, IMAGE_FILE_DLL,
    IMAGE_FILE_EXECUTABLE_IMAGE, IMAGE_FILE_LARGE_ADDRESS_AWARE, IMAGE_FILE_NET_RUN_FROM_SWAP,
    IMAGE_FILE_RELOCS_STRIPPED, IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP, IMAGE_FILE_SYSTEM,
    IMAGE_FILE_UP_SYSTEM_ONLY,
};
use serde::Serialize;

/// Role flags derived from the file header's characteristics.
///
/// Each flag is an independent bit test. Contradictory combinations (a DLL
/// that is also a system file) are reported as found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub is_dll: bool,
    /// Driver or other system file.
    pub is_system_file: bool,
    pub is_executable_image: bool,
    pub is_large_address_aware: bool,
    pub is_32bit_machine: bool,
    pub relocs_stripped: bool,
    pub debug_stripped: bool,
    pub removable_run_from_swap: bool,
    pub net_run_from_swap: bool,
    pub up_system_only: bool,
}

impl Classification {
    pub fn from_characteristics(characteristics: u16) -> Self {
        let has = |bit: u16| characteristics & bit == bit;
        Classification {
            is_dll: has(IMAGE_FILE_DLL),
            is_system_file: has(IMAGE_FILE_SYSTEM),
            is_executable_image: has(IMAGE_FILE_EXECUTABLE_IMAGE),
            is_large_address_aware: has(IMAGE_FILE_LARGE_ADDRESS_AWARE),
            is_32bit_machine: has(IMAGE_FILE_32BIT_MACHINE),
            relocs_stripped: has(IMAGE_FILE_RELOCS_STRIPPED),
            debug_stripped: has(IMAGE_FILE_DEBUG_STRIPPED),
            removable_run_from_swap: has(IMAGE_FILE_REMOVABLE_RUN_FROM_SWAP),
            net_run_from_swap: has(IMAGE_FILE_NET_RUN_FROM_SWAP),
            up_system_only: has(IMAGE_FILE_UP_SYSTEM_ONLY),
        }
    }

    /// Names of the set flags, in bit order.
    pub fn flag_names(&self) -> Vec<&'static str> {
        [
            (self.relocs_stripped, "RELOCS_STRIPPED"),
            (self.is_executable_image, "EXECUTABLE_IMAGE"),
            (self.is_large_address_aware, "LARGE_ADDRESS_AWARE"),
            (self.is_32bit_machine, "32BIT_MACHINE"),
            (self.debug_stripped, "DEBUG_STRIPPED"),
            (self.removable_run_from_swap, "REMOVABLE_RUN_FROM_SWAP"),
            (self.net_run_from_swap, "NET_RUN_FROM_SWAP"),
            (self.is_system_file, "SYSTEM"),
            (self.is_dll, "DLL"),
            (self.up_system_only, "UP_SYSTEM_ONLY"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }

    /// Short role label: "DLL", "SYS", "EXE" or "OBJ", checked in that order.
    pub fn role(&self) -> &'static str {
        if self.is_dll {
            "DLL"
        } else if self.is_system_file {
            "SYS"
        } else if self.is_executable_image {
            "EXE"
        } else {
            "OBJ"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dll_bit_only() {
        let c = Classification::from_characteristics(0x2000);
        assert!(c.is_dll);
        assert!(!c.is_system_file);
    }

    #[test]
    fn system_bit_only() {
        let c = Classification::from_characteristics(0x1000);
        assert!(!c.is_dll);
        assert!(c.is_system_file);
    }

    #[test]
    fn contradictory_bits_reported_verbatim() {
        let c = Classification::from_characteristics(0x3000);
        assert!(c.is_dll);
        assert!(c.is_system_file);
        assert_eq!(c.flag_names(), vec!["SYSTEM", "DLL"]);
    }

    #[test]
    fn typical_exe() {
        let c = Classification::from_characteristics(0x0022);
        assert!(c.is_executable_image);
        assert!(c.is_large_address_aware);
        assert!(!c.is_dll);
        assert_eq!(c.role(), "EXE");
    }

    #[test]
    fn empty_bitfield_sets_nothing() {
        assert_eq!(
            Classification::from_characteristics(0),
            Classification::default()
        );
        assert!(Classification::default().flag_names().is_empty());
    }
}
