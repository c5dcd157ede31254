//! Common effect descriptors shared by the adapters.

use crate::types::{ColourCount, EffectDescriptor, ParameterKind, ParameterOption};

pub fn none() -> EffectDescriptor {
    EffectDescriptor::new("none", "None")
}

pub fn static_colour() -> EffectDescriptor {
    EffectDescriptor::new("static", "Static").with_colours(ColourCount::Exact(1))
}

pub fn spectrum() -> EffectDescriptor {
    EffectDescriptor::new("spectrum", "Spectrum")
}

/// Direction: 1 = left, 2 = right.
pub fn wave() -> EffectDescriptor {
    EffectDescriptor::new("wave", "Wave").with_parameter(ParameterKind::Integer { min: 1, max: 2 })
}

pub fn breath() -> EffectDescriptor {
    EffectDescriptor::new("breath", "Breath")
        .with_colours(ColourCount::Exact(1))
        .with_parameter(ParameterKind::Enumerated {
            options: vec![
                ParameterOption::new("random", "Random").with_colours(ColourCount::Exact(0)),
                ParameterOption::new("single", "Single").with_colours(ColourCount::Exact(1)),
                ParameterOption::new("dual", "Dual").with_colours(ColourCount::Exact(2)),
                ParameterOption::new("triple", "Triple").with_colours(ColourCount::Exact(3)),
            ],
        })
}

pub fn reactive() -> EffectDescriptor {
    EffectDescriptor::new("reactive", "Reactive")
        .with_colours(ColourCount::Exact(1))
        .with_parameter(ParameterKind::Enumerated {
            options: vec![
                ParameterOption::new("fast", "Fast"),
                ParameterOption::new("medium", "Medium"),
                ParameterOption::new("slow", "Slow"),
            ],
        })
}

/// Blend across any number of colours.
pub fn gradient() -> EffectDescriptor {
    EffectDescriptor::new("gradient", "Gradient").with_colours(ColourCount::Variable)
}

pub fn brightness() -> EffectDescriptor {
    EffectDescriptor::brightness()
}
