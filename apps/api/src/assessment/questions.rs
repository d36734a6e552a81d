use crate::models::Question;

/// The career self-assessment, in presentation order.
pub const QUESTIONS: &[Question] = &[
    Question {
        id: 1,
        prompt: "What aspects of technology interest you the most?",
        options: &[
            "Building and designing user interfaces",
            "Working with data and algorithms",
            "Securing systems and networks",
            "Creating mobile applications",
        ],
    },
    Question {
        id: 2,
        prompt: "How do you prefer to solve problems?",
        options: &[
            "Through visual and creative solutions",
            "By analyzing data and patterns",
            "By following structured methodologies",
            "Through hands-on experimentation",
        ],
    },
    Question {
        id: 3,
        prompt: "What type of work environment do you prefer?",
        options: &[
            "Collaborative and team-based",
            "Independent and focused",
            "Fast-paced and dynamic",
            "Structured and organized",
        ],
    },
];
