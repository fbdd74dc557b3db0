// Licensed under the Apache-2.0 license

//! Graphics object identifiers.
//!
//! The firmware packs an object id into 16 bits: type in bits 15:12, enum
//! (instance) in bits 11:8, and a type-specific id in bits 7:0. The decoded
//! form renumbers encoder, connector and generic ids into the dense driver
//! numbering; GPU ids are kept verbatim and router ids are dropped.

const OBJECT_ID_MASK: u16 = 0x00FF;
const ENUM_ID_MASK: u16 = 0x0F00;
const ENUM_ID_SHIFT: u16 = 8;
const OBJECT_TYPE_MASK: u16 = 0xF000;
const OBJECT_TYPE_SHIFT: u16 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Unknown,
    Gpu,
    Encoder,
    Connector,
    Router,
    Generic,
}

impl ObjectType {
    /// Type nibble (bits 15:12) of a firmware object id. Nibbles with no
    /// known type decode to [`ObjectType::Unknown`].
    #[must_use]
    pub const fn from_bios(raw: u16) -> Self {
        match (raw & OBJECT_TYPE_MASK) >> OBJECT_TYPE_SHIFT {
            0x1 => Self::Gpu,
            0x2 => Self::Encoder,
            0x3 => Self::Connector,
            0x4 => Self::Router,
            0x7 => Self::Generic,
            _ => Self::Unknown,
        }
    }

    fn to_bios(self) -> Option<u16> {
        let nibble = match self {
            Self::Gpu => 0x1,
            Self::Encoder => 0x2,
            Self::Connector => 0x3,
            Self::Router => 0x4,
            Self::Generic => 0x7,
            Self::Unknown => return None,
        };
        Some(nibble << OBJECT_TYPE_SHIFT)
    }
}

/// (firmware id, driver id)
const ENCODER_IDS: [(u8, u8); 19] = [
    (0x01, 1),  // internal LVDS
    (0x02, 2),  // internal TMDS1
    (0x03, 3),  // internal TMDS2
    (0x04, 4),  // internal DAC1
    (0x05, 5),  // internal DAC2
    (0x0F, 6),  // internal LVTM1
    (0x12, 7),  // internal HDMI
    (0x13, 8),  // KLDSCP TMDS1
    (0x15, 9),  // KLDSCP DAC1
    (0x16, 10), // KLDSCP DAC2
    (0x18, 11), // MVPU FPGA
    (0x19, 12), // internal DDI
    (0x1E, 13), // UNIPHY
    (0x1F, 14), // KLDSCP LVTMA
    (0x20, 15), // UNIPHY1
    (0x21, 16), // UNIPHY2
    (0x22, 17), // Almond / Nutmeg
    (0x23, 18), // Travis
    (0x25, 20), // UNIPHY3
];

const CONNECTOR_IDS: [(u8, u8); 12] = [
    (0x01, 1),  // single link DVI-I
    (0x02, 2),  // dual link DVI-I
    (0x03, 3),  // single link DVI-D
    (0x04, 4),  // dual link DVI-D
    (0x05, 5),  // VGA
    (0x0C, 12), // HDMI type A
    (0x0E, 14), // LVDS
    (0x10, 16), // PCIe
    (0x12, 18), // hardcoded DVI
    (0x13, 19), // DisplayPort
    (0x14, 20), // eDP
    (0x15, 21), // MXM
];

const GENERIC_IDS: [(u8, u8); 3] = [
    (0x03, 1), // MXM OPM
    (0x01, 2), // GLSync
    (0x04, 3), // stereo pin
];

fn to_driver(table: &[(u8, u8)], bios_id: u8) -> u8 {
    table
        .iter()
        .find(|(bios, _)| *bios == bios_id)
        .map_or(0, |(_, driver)| *driver)
}

fn to_firmware(table: &[(u8, u8)], driver_id: u8) -> Option<u8> {
    table
        .iter()
        .find(|(_, driver)| *driver == driver_id)
        .map(|(bios, _)| *bios)
}

/// A decoded graphics object id. Equal when id, enum and type all match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicsObjectId {
    pub id: u8,
    pub enum_id: u8,
    pub object_type: ObjectType,
}

impl GraphicsObjectId {
    #[must_use]
    pub const fn new(id: u8, enum_id: u8, object_type: ObjectType) -> Self {
        Self {
            id,
            enum_id,
            object_type,
        }
    }

    /// Decodes a firmware object id.
    ///
    /// Returns `None` when [`ObjectType::from_bios`] gives
    /// [`ObjectType::Unknown`] or the enum is outside 1..=7, so a decoded id
    /// never carries the unknown type. Ids the driver numbering has no entry
    /// for decode to 0.
    #[must_use]
    pub fn from_bios(raw: u16) -> Option<Self> {
        let object_type = ObjectType::from_bios(raw);
        if object_type == ObjectType::Unknown {
            return None;
        }

        let enum_id = ((raw & ENUM_ID_MASK) >> ENUM_ID_SHIFT) as u8;
        if !(1..=7).contains(&enum_id) {
            return None;
        }

        let bios_id = (raw & OBJECT_ID_MASK) as u8;
        let id = match object_type {
            ObjectType::Gpu => bios_id,
            ObjectType::Encoder => to_driver(&ENCODER_IDS, bios_id),
            ObjectType::Connector => to_driver(&CONNECTOR_IDS, bios_id),
            ObjectType::Generic => to_driver(&GENERIC_IDS, bios_id),
            ObjectType::Router | ObjectType::Unknown => 0,
        };

        Some(Self::new(id, enum_id, object_type))
    }

    /// Encodes back into the firmware form.
    ///
    /// Returns `None` when the id has no firmware counterpart, which includes
    /// every router id.
    #[must_use]
    pub fn to_bios(&self) -> Option<u16> {
        let type_bits = self.object_type.to_bios()?;
        if !(1..=7).contains(&self.enum_id) {
            return None;
        }

        let bios_id = match self.object_type {
            ObjectType::Gpu => Some(self.id),
            ObjectType::Encoder => to_firmware(&ENCODER_IDS, self.id),
            ObjectType::Connector => to_firmware(&CONNECTOR_IDS, self.id),
            ObjectType::Generic => to_firmware(&GENERIC_IDS, self.id),
            ObjectType::Router | ObjectType::Unknown => None,
        }?;

        Some(type_bits | (u16::from(self.enum_id) << ENUM_ID_SHIFT) | u16::from(bios_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_connectors() {
        assert_eq!(
            GraphicsObjectId::from_bios(0x310C),
            Some(GraphicsObjectId::new(12, 1, ObjectType::Connector))
        );
        assert_eq!(
            GraphicsObjectId::from_bios(0x3213),
            Some(GraphicsObjectId::new(19, 2, ObjectType::Connector))
        );
        // Composite has no driver id.
        assert_eq!(
            GraphicsObjectId::from_bios(0x3106),
            Some(GraphicsObjectId::new(0, 1, ObjectType::Connector))
        );
    }

    #[test]
    fn test_decode_encoders_and_generics() {
        assert_eq!(
            GraphicsObjectId::from_bios(0x211E),
            Some(GraphicsObjectId::new(13, 1, ObjectType::Encoder))
        );
        assert_eq!(
            GraphicsObjectId::from_bios(0x2125).map(|id| id.id),
            Some(20)
        );
        assert_eq!(
            GraphicsObjectId::from_bios(0x7103),
            Some(GraphicsObjectId::new(1, 1, ObjectType::Generic))
        );
        assert_eq!(
            GraphicsObjectId::from_bios(0x4101),
            Some(GraphicsObjectId::new(0, 1, ObjectType::Router))
        );
        assert_eq!(
            GraphicsObjectId::from_bios(0x1142),
            Some(GraphicsObjectId::new(0x42, 1, ObjectType::Gpu))
        );
    }

    #[test]
    fn test_invalid_type_or_enum() {
        assert_eq!(GraphicsObjectId::from_bios(0x0000), None);
        assert_eq!(GraphicsObjectId::from_bios(0x610C), None);
        assert_eq!(GraphicsObjectId::from_bios(0x300C), None);
        assert_eq!(GraphicsObjectId::from_bios(0x380C), None);
    }

    #[test]
    fn test_router_has_no_encoding() {
        let router = GraphicsObjectId::new(0, 1, ObjectType::Router);
        assert_eq!(router.to_bios(), None);
    }

    #[test]
    fn test_type_nibbles() {
        assert_eq!(ObjectType::from_bios(0x1000), ObjectType::Gpu);
        assert_eq!(ObjectType::from_bios(0x2FFF), ObjectType::Encoder);
        assert_eq!(ObjectType::from_bios(0x310C), ObjectType::Connector);
        assert_eq!(ObjectType::from_bios(0x4101), ObjectType::Router);
        assert_eq!(ObjectType::from_bios(0x7103), ObjectType::Generic);
        for nibble in [0x0u16, 0x5, 0x6, 0x8, 0xF] {
            assert_eq!(ObjectType::from_bios(nibble << 12), ObjectType::Unknown);
        }
    }

    proptest! {
        #[test]
        fn test_unknown_type_nibbles(
            nibble in prop::sample::select(vec![0u16, 5, 6, 8, 9, 10, 11, 12, 13, 14, 15]),
            low in 0u16..0x1000,
        ) {
            let raw = (nibble << 12) | low;
            prop_assert_eq!(ObjectType::from_bios(raw), ObjectType::Unknown);
            prop_assert_eq!(GraphicsObjectId::from_bios(raw), None);
        }

        #[test]
        fn test_decoded_type_is_never_unknown(raw in any::<u16>()) {
            if let Some(id) = GraphicsObjectId::from_bios(raw) {
                prop_assert_eq!(id.object_type, ObjectType::from_bios(raw));
                prop_assert_ne!(id.object_type, ObjectType::Unknown);
            }
        }

        #[test]
        fn test_mapped_ids_round_trip(raw in any::<u16>()) {
            if let Some(id) = GraphicsObjectId::from_bios(raw) {
                let mapped = id.object_type != ObjectType::Router
                    && (id.object_type == ObjectType::Gpu || id.id != 0);
                if mapped {
                    prop_assert_eq!(id.to_bios(), Some(raw));
                    prop_assert_eq!(GraphicsObjectId::from_bios(raw), Some(id));
                }
            }
        }
    }
}
