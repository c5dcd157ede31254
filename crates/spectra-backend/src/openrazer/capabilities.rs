// Capability derivation for OpenRazer devices.
//
// The daemon does not describe effects directly; which effects a zone
// supports is inferred from the methods present on the device object's
// D-Bus interfaces. Everything here is pure so it can be tested without
// a bus.

use std::collections::{HashMap, HashSet};

use crate::effects;
use crate::types::{
    EffectDescriptor, ParameterKind, ParameterValue, RawZone, RawZoneState, StateChange,
};

pub(crate) const BRIGHTNESS_INTERFACE: &str = "razer.device.lighting.brightness";

/// A lighting zone and the interface/method prefix that drives it.
pub(crate) struct ZoneSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub interface: &'static str,
    pub prefix: &'static str,
}

pub(crate) const ZONES: &[ZoneSpec] = &[
    ZoneSpec {
        id: "main",
        label: "Main",
        interface: "razer.device.lighting.chroma",
        prefix: "",
    },
    ZoneSpec {
        id: "logo",
        label: "Logo",
        interface: "razer.device.lighting.logo",
        prefix: "Logo",
    },
    ZoneSpec {
        id: "scroll",
        label: "Scroll Wheel",
        interface: "razer.device.lighting.scroll",
        prefix: "Scroll",
    },
    ZoneSpec {
        id: "backlight",
        label: "Backlight",
        interface: "razer.device.lighting.backlight",
        prefix: "Backlight",
    },
];

pub(crate) fn zone_spec(id: &str) -> Option<&'static ZoneSpec> {
    ZONES.iter().find(|z| z.id == id)
}

impl ZoneSpec {
    fn method(&self, effect: &str) -> String {
        format!("set{}{effect}", self.prefix)
    }

    /// Interface and method that set this zone's brightness.
    pub fn brightness_method(&self) -> (&'static str, String) {
        if self.prefix.is_empty() {
            (BRIGHTNESS_INTERFACE, "setBrightness".to_owned())
        } else {
            (self.interface, self.method("Brightness"))
        }
    }

    /// Interface and method that read this zone's brightness.
    pub fn brightness_getter(&self) -> (&'static str, String) {
        if self.prefix.is_empty() {
            (BRIGHTNESS_INTERFACE, "getBrightness".to_owned())
        } else {
            (self.interface, format!("get{}Brightness", self.prefix))
        }
    }
}

// ── Introspection ────────────────────────────────────────────────────

/// Interface → method names, read from introspection XML.
#[derive(Debug, Default)]
pub(crate) struct Introspection {
    interfaces: HashMap<String, HashSet<String>>,
}

impl Introspection {
    pub fn parse(xml: &str) -> Result<Self, zbus_xml::Error> {
        let node = zbus_xml::Node::from_reader(xml.as_bytes())?;
        let interfaces = node
            .interfaces()
            .iter()
            .map(|iface| {
                let methods: HashSet<String> = iface
                    .methods()
                    .iter()
                    .map(|m| m.name().to_string())
                    .collect();
                (iface.name().to_string(), methods)
            })
            .collect();
        Ok(Self { interfaces })
    }

    pub fn has(&self, interface: &str, method: &str) -> bool {
        self.interfaces
            .get(interface)
            .is_some_and(|m| m.contains(method))
    }
}

// ── Zones & effects ──────────────────────────────────────────────────

fn breath_for(intro: &Introspection, zone: &ZoneSpec) -> Option<EffectDescriptor> {
    let mut base = effects::breath();
    if let ParameterKind::Enumerated { ref mut options } = base.parameter {
        options.retain(|o| intro.has(zone.interface, &zone.method(&breath_suffix(&o.id))));
        if options.is_empty() {
            return None;
        }
    }
    Some(base)
}

fn breath_suffix(option: &str) -> String {
    let mut chars = option.chars();
    let capitalised: String = chars
        .next()
        .map(|c| c.to_ascii_uppercase())
        .into_iter()
        .chain(chars)
        .collect();
    format!("Breath{capitalised}")
}

/// Effects a zone supports, in display order.
pub(crate) fn zone_effects(intro: &Introspection, zone: &ZoneSpec) -> Vec<EffectDescriptor> {
    let has = |effect: &str| intro.has(zone.interface, &zone.method(effect));
    let mut out = Vec::new();

    if has("None") {
        out.push(effects::none());
    }
    if has("Static") {
        out.push(effects::static_colour());
    }
    if has("Spectrum") {
        out.push(effects::spectrum());
    }
    if has("Wave") {
        out.push(effects::wave());
    }
    if let Some(breath) = breath_for(intro, zone) {
        out.push(breath);
    }
    if has("Reactive") {
        out.push(effects::reactive());
    }
    let (iface, method) = zone.brightness_method();
    if intro.has(iface, &method) {
        out.push(effects::brightness());
    }
    out
}

/// Every zone with at least one effect.
pub(crate) fn zones(intro: &Introspection) -> Vec<RawZone> {
    ZONES
        .iter()
        .filter_map(|spec| {
            let effects = zone_effects(intro, spec);
            (!effects.is_empty()).then(|| RawZone {
                id: spec.id.to_owned(),
                label: Some(spec.label.to_owned()),
                effects,
                state: RawZoneState::default(),
            })
        })
        .collect()
}

// ── Call planning ────────────────────────────────────────────────────

/// Arguments for a lighting method call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Args {
    Unit,
    Colours(Vec<u8>),
    Direction(i32),
    Reactive([u8; 4]),
    Brightness(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plan {
    pub interface: &'static str,
    pub method: String,
    pub args: Args,
}

fn flatten(change: &StateChange) -> Vec<u8> {
    change.colours.iter().flat_map(|c| c.to_array()).collect()
}

fn reactive_speed(param: Option<&ParameterValue>) -> u8 {
    match param {
        Some(ParameterValue::Enumerated(s)) if s == "fast" => 1,
        Some(ParameterValue::Enumerated(s)) if s == "slow" => 3,
        _ => 2,
    }
}

/// Translate a validated state change into one D-Bus call.
pub(crate) fn plan(zone: &ZoneSpec, change: &StateChange) -> Result<Plan, String> {
    let simple = |suffix: &str, args: Args| Plan {
        interface: zone.interface,
        method: zone.method(suffix),
        args,
    };

    let plan = match change.effect.as_str() {
        "none" => simple("None", Args::Unit),
        "spectrum" => simple("Spectrum", Args::Unit),
        "static" => simple("Static", Args::Colours(flatten(change))),
        "wave" => match change.parameter {
            Some(ParameterValue::Integer(direction)) => simple(
                "Wave",
                Args::Direction(i32::try_from(direction).map_err(|e| e.to_string())?),
            ),
            _ => simple("Wave", Args::Direction(1)),
        },
        "breath" => {
            let option = match change.parameter {
                Some(ParameterValue::Enumerated(ref id)) => id.clone(),
                _ => match change.colours.len() {
                    0 => "random".to_owned(),
                    1 => "single".to_owned(),
                    2 => "dual".to_owned(),
                    _ => "triple".to_owned(),
                },
            };
            let args = if option == "random" {
                Args::Unit
            } else {
                Args::Colours(flatten(change))
            };
            simple(&breath_suffix(&option), args)
        }
        "reactive" => {
            let [r, g, b] = change.colours.first().map(|c| c.to_array()).unwrap_or_default();
            simple(
                "Reactive",
                Args::Reactive([r, g, b, reactive_speed(change.parameter.as_ref())]),
            )
        }
        "brightness" => {
            let level = match change.parameter {
                Some(ParameterValue::Integer(level)) => level.clamp(0, 100),
                _ => return Err("brightness requires an integer level".to_owned()),
            };
            let (interface, method) = zone.brightness_method();
            Plan {
                interface,
                method,
                args: Args::Brightness(f64::from(u8::try_from(level).unwrap_or(100))),
            }
        }
        other => return Err(format!("effect {other:?} is not supported by openrazer")),
    };
    Ok(plan)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::{ColourCount, Rgb};

    const XML: &str = r#"
<node>
  <interface name="razer.device.misc">
    <method name="getDeviceName"><arg direction="out" type="s"/></method>
  </interface>
  <interface name="razer.device.lighting.chroma">
    <method name="setStatic"><arg direction="in" type="y"/></method>
    <method name="setSpectrum"></method>
    <method name="setWave"><arg direction="in" type="i"/></method>
    <method name="setBreathSingle"/>
    <method name="setBreathDual"/>
    <method name="setNone"/>
    <method name="setKeyRow"/>
    <method name="setCustom"/>
  </interface>
  <interface name="razer.device.lighting.brightness">
    <method name="setBrightness"/>
  </interface>
  <interface name="razer.device.lighting.logo">
    <method name="setLogoStatic"/>
  </interface>
</node>"#;

    #[test]
    fn zones_follow_introspected_methods() {
        let intro = Introspection::parse(XML).unwrap();
        assert!(intro.has("razer.device.misc", "getDeviceName"));
        assert!(!intro.has("razer.device.misc", "setStatic"));

        let zones = zones(&intro);
        let ids: Vec<&str> = zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["main", "logo"]);

        let main: Vec<&str> = zones[0].effects.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(main, vec!["none", "static", "spectrum", "wave", "breath", "brightness"]);

        let breath = &zones[0].effects[4];
        let options: Vec<&str> = match breath.parameter {
            ParameterKind::Enumerated { ref options } => {
                options.iter().map(|o| o.id.as_str()).collect()
            }
            _ => Vec::new(),
        };
        assert_eq!(options, vec!["single", "dual"]);
        assert_eq!(breath.colours, ColourCount::Exact(1));
    }

    #[test]
    fn commented_out_methods_are_ignored() {
        let xml = r#"<!DOCTYPE node PUBLIC "-//freedesktop//DTD D-BUS Object Introspection 1.0//EN"
 "http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd">
<node>
  <interface name="razer.device.lighting.logo">
    <!-- <method name="setLogoSpectrum"/> -->
    <method name="setLogoStatic">
      <annotation name="note" value="takes &quot;rgb&quot; &gt; bytes"/>
    </method>
  </interface>
</node>"#;
        let intro = Introspection::parse(xml).unwrap();
        assert!(intro.has("razer.device.lighting.logo", "setLogoStatic"));
        assert!(!intro.has("razer.device.lighting.logo", "setLogoSpectrum"));

        let logo = zones(&intro);
        assert_eq!(logo.len(), 1);
        assert_eq!(logo[0].effects.len(), 1);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(Introspection::parse("<node><interface name=").is_err());
    }

    #[test]
    fn plans_dual_breath() {
        let change = StateChange {
            zone: "main".into(),
            effect: "breath".into(),
            parameter: Some(ParameterValue::Enumerated("dual".into())),
            colours: vec![Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)],
        };
        let plan = plan(zone_spec("main").unwrap(), &change).unwrap();
        assert_eq!(plan.method, "setBreathDual");
        assert_eq!(plan.args, Args::Colours(vec![255, 0, 0, 0, 0, 255]));
    }

    #[test]
    fn plans_zone_brightness() {
        let change = StateChange {
            zone: "logo".into(),
            effect: "brightness".into(),
            parameter: Some(ParameterValue::Integer(50)),
            colours: Vec::new(),
        };
        let logo = plan(zone_spec("logo").unwrap(), &change).unwrap();
        assert_eq!(logo.interface, "razer.device.lighting.logo");
        assert_eq!(logo.method, "setLogoBrightness");
        assert_eq!(logo.args, Args::Brightness(50.0));

        let main = plan(zone_spec("main").unwrap(), &change).unwrap();
        assert_eq!(main.interface, BRIGHTNESS_INTERFACE);
        assert_eq!(main.method, "setBrightness");
    }

    #[test]
    fn unknown_effect_is_rejected() {
        let change = StateChange {
            zone: "main".into(),
            effect: "starlight".into(),
            parameter: None,
            colours: Vec::new(),
        };
        assert!(plan(zone_spec("main").unwrap(), &change).is_err());
    }
}
