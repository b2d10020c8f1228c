/// How a disability presents in math work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisabilityProfile {
    /// Disability name as used in requests
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Typical traits
    pub characteristics: &'static [&'static str],
    /// Effect on math problem solving
    pub math_impact: &'static str,
}

/// Known profiles; the first entry is the fallback
pub static PROFILES: [DisabilityProfile; 7] = [
    DisabilityProfile {
        name: "Dyslexia",
        description: "Difficulty reading, writing and processing written information",
        characteristics: &[
            "letter and number reversals",
            "trouble with sequences",
            "slow processing",
        ],
        math_impact: "May reverse digits (6 and 9), lose track of multi-step problems, confuse similar-looking numbers",
    },
    DisabilityProfile {
        name: "Dyscalculia",
        description: "Difficulty with number sense, calculation and mathematical reasoning",
        characteristics: &[
            "weak number sense",
            "trouble with basic operations",
            "unreliable math facts",
        ],
        math_impact: "May confuse operations, struggle with place value, find mental math hard",
    },
    DisabilityProfile {
        name: "Attention Deficit Hyperactivity Disorder",
        description: "Difficulty with attention, focus and executive function",
        characteristics: &["inattention", "impulsivity", "short sustained focus"],
        math_impact: "May skip steps, rush, make careless errors, lose track of multi-step work",
    },
    DisabilityProfile {
        name: "Dysgraphia",
        description: "Difficulty with writing and fine motor skills",
        characteristics: &[
            "hard-to-read handwriting",
            "trouble with written expression",
            "motor coordination issues",
        ],
        math_impact: "May miscopy numbers, misalign written calculations, struggle to organize work on paper",
    },
    DisabilityProfile {
        name: "Auditory Processing Disorder",
        description: "Difficulty processing and interpreting sounds and speech",
        characteristics: &[
            "trouble following spoken instructions",
            "weak auditory memory",
        ],
        math_impact: "May mishear numbers in word problems, struggle with spoken math instructions",
    },
    DisabilityProfile {
        name: "Non verbal Learning Disorder",
        description: "Difficulty with visual-spatial processing and nonverbal reasoning",
        characteristics: &[
            "weak visual-spatial skills",
            "trouble seeing patterns",
            "poor visual organization",
        ],
        math_impact: "May struggle with geometry, diagrams and spatial relationships",
    },
    DisabilityProfile {
        name: "Language Processing Disorder",
        description: "Difficulty understanding and using language",
        characteristics: &["trouble with complex language", "trouble with abstract ideas"],
        math_impact: "May misread word problems, struggle with math vocabulary and abstract reasoning",
    },
];

impl DisabilityProfile {
    /// Profile for a disability name, Dyslexia when unknown
    #[must_use]
    pub fn lookup(name: &str) -> &'static Self {
        PROFILES
            .iter()
            .find(|p| p.name == name)
            .unwrap_or(&PROFILES[0])
    }
}
