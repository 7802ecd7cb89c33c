/// SNMPv2-MIB::sysDescr.0, doubles as the liveness probe
pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";

/// ENTITY-MIB::entPhysicalEntry
pub const ENT_PHYSICAL_ENTRY: &str = "1.3.6.1.2.1.47.1.1.1.1";

/// entPhysicalEntry columns walked by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityColumn {
    Descr = 2,
    ContainedIn = 4,
    Class = 5,
    ParentRelPos = 6,
    Name = 7,
    HardwareRev = 8,
    FirmwareRev = 9,
    SoftwareRev = 10,
    SerialNum = 11,
    MfgName = 12,
    ModelName = 13,
}

use EntityColumn::*;

impl EntityColumn {
    /// Columns walked for a regular device
    pub const FULL: &'static [EntityColumn] = &[
        Descr,
        ContainedIn,
        Class,
        ParentRelPos,
        Name,
        HardwareRev,
        FirmwareRev,
        SoftwareRev,
        SerialNum,
        MfgName,
        ModelName,
    ];

    /// Columns walked one at a time for devices that cannot finish a full walk
    pub const CHUNKED: &'static [EntityColumn] = &[Descr, Class, Name, SerialNum, ModelName];

    pub fn sub_id(self) -> u32 {
        self as u32
    }

    pub fn oid(self) -> String {
        format!("{}.{}", ENT_PHYSICAL_ENTRY, self.sub_id())
    }

    pub fn table_name(self) -> &'static str {
        match self {
            Descr => "entPhysicalDescr",
            ContainedIn => "entPhysicalContainedIn",
            Class => "entPhysicalClass",
            ParentRelPos => "entPhysicalParentRelPos",
            Name => "entPhysicalName",
            HardwareRev => "entPhysicalHardwareRev",
            FirmwareRev => "entPhysicalFirmwareRev",
            SoftwareRev => "entPhysicalSoftwareRev",
            SerialNum => "entPhysicalSerialNum",
            MfgName => "entPhysicalMfgName",
            ModelName => "entPhysicalModelName",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_oids() {
        assert_eq!(Descr.oid(), "1.3.6.1.2.1.47.1.1.1.1.2");
        assert_eq!(SerialNum.oid(), "1.3.6.1.2.1.47.1.1.1.1.11");
        assert_eq!(ModelName.oid(), "1.3.6.1.2.1.47.1.1.1.1.13");
    }

    #[test]
    fn test_chunked_is_subset_of_full() {
        assert_eq!(EntityColumn::CHUNKED.len(), 5);
        assert!(EntityColumn::CHUNKED.iter().all(|c| EntityColumn::FULL.contains(c)));
    }
}
