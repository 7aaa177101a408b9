//! Validated clinical instruments worth suggesting over bespoke questions.

/// One validated instrument in the suggestion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub domain: &'static str,
}

pub const VALIDATED_INSTRUMENTS: [Instrument; 4] = [
    Instrument {
        key: "eq5d",
        name: "EQ-5D-5L",
        description: "Quality of life measure",
        domain: "patient_reported_outcomes",
    },
    Instrument {
        key: "barthel",
        name: "Barthel Index",
        description: "Activities of daily living",
        domain: "functional_assessment",
    },
    Instrument {
        key: "phq9",
        name: "PHQ-9",
        description: "Depression screening",
        domain: "mental_health",
    },
    Instrument {
        key: "gad7",
        name: "GAD-7",
        description: "Anxiety screening",
        domain: "mental_health",
    },
];

/// Instruments whose name words appear in the question text.
pub fn matching_instruments(question_text: &str) -> Vec<&'static Instrument> {
    let text = question_text.to_lowercase();
    VALIDATED_INSTRUMENTS
        .iter()
        .filter(|instrument| {
            instrument
                .name
                .to_lowercase()
                .split_whitespace()
                .any(|word| text.contains(word))
        })
        .collect()
}
