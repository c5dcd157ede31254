// ── Form factors ──
//
// The fixed table of device categories. Backends report free-form type
// strings; anything not in the table is treated as an accessory.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Known device categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[non_exhaustive]
pub enum FormFactorKind {
    Keyboard,
    Mouse,
    Mousemat,
    Keypad,
    Headset,
    Speaker,
    Stand,
    Gpu,
    Mug,
    Core,
    Accessory,
}

impl FormFactorKind {
    /// Parse a backend-reported type, falling back to [`Self::Accessory`].
    pub fn parse(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Accessory)
    }

    pub fn id(self) -> &'static str {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Keyboard => "Keyboard",
            Self::Mouse => "Mouse",
            Self::Mousemat => "Mousemat",
            Self::Keypad => "Keypad",
            Self::Headset => "Headset",
            Self::Speaker => "Speaker",
            Self::Stand => "Headphone Stand",
            Self::Gpu => "Graphics Card",
            Self::Mug => "Mug Holder",
            Self::Core => "Chroma Core",
            Self::Accessory => "Accessory",
        }
    }
}

/// A form factor as exposed to callers: `{id, icon, label}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFactor {
    pub id: String,
    pub icon: String,
    pub label: String,
}

impl FormFactor {
    /// Look up `raw` in the table; unknown ids map to the accessory entry.
    pub fn from_id(raw: &str) -> Self {
        Self::from(FormFactorKind::parse(raw))
    }

    pub fn kind(&self) -> FormFactorKind {
        FormFactorKind::parse(&self.id)
    }

    /// Every entry of the table, in display order.
    pub fn all() -> Vec<Self> {
        FormFactorKind::iter().map(Self::from).collect()
    }
}

impl From<FormFactorKind> for FormFactor {
    fn from(kind: FormFactorKind) -> Self {
        Self {
            id: kind.id().to_owned(),
            icon: format!("img/devices/{}.svg", kind.id()),
            label: kind.label().to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn known_ids_round_trip() {
        let ff = FormFactor::from_id("keyboard");
        assert_eq!(ff.id, "keyboard");
        assert_eq!(ff.icon, "img/devices/keyboard.svg");
        assert_eq!(ff.label, "Keyboard");
        assert_eq!(FormFactor::from_id("MouseMat").id, "mousemat");
    }

    #[test]
    fn unknown_ids_are_accessories() {
        assert_eq!(FormFactor::from_id("toaster").id, "accessory");
        assert_eq!(FormFactor::from_id("").kind(), FormFactorKind::Accessory);
    }

    #[test]
    fn serializes_id_icon_label_in_order() {
        let json = serde_json::to_string(&FormFactor::from_id("mouse")).unwrap();
        assert_eq!(
            json,
            r#"{"id":"mouse","icon":"img/devices/mouse.svg","label":"Mouse"}"#
        );
    }

    #[test]
    fn table_covers_every_kind() {
        assert_eq!(FormFactor::all().len(), 11);
    }
}
