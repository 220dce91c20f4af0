//! Fixed texts and session settings for the admissions assistant.

use academy_ai::{GenerationConfig, Model};

/// Locally authored first message of every conversation. Never sent upstream.
pub const GREETING: &str = "Hello! Welcome to Gemini Academy. I can help you with admissions, \
tuition, or curriculum questions. Ask me anything!";

/// Shown in place of a reply whenever a turn fails, whatever the cause.
pub const APOLOGY: &str = "I'm sorry, I'm having trouble connecting to the school servers right \
now. Please try again later.";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Persona, school facts, and length guidance loaded into every session.
pub const SYSTEM_INSTRUCTION: &str = r#"You are the helpful AI Admissions Assistant for "Gemini Academy", a prestigious international school (K-12).
Your goal is to answer questions from parents and students politely, professionally, and concisely.

Here is the key information about the school:
- **Location**: Silicon Valley, California.
- **Curriculum**: We offer the International Baccalaureate (IB) Diploma Program and standard American High School Diploma.
- **Grades**: Kindergarten through Grade 12.
- **Tuition**: $25,000 per year (Financial aid is available).
- **Student-Teacher Ratio**: 12:1.
- **Values**: Innovation, Integrity, Inclusivity.
- **Motto**: "Empowering Future Leaders."
- **Application Deadline**: March 1st for the upcoming Fall semester.
- **Sports**: Basketball, Soccer, Swimming, Tennis, Robotics Team.

If you don't know an answer, politely suggest they contact the admissions office at admissions@geminiacademy.edu or call +1 (555) 012-3456.
Keep responses under 100 words unless detailed information is requested."#;

/// Settings a session is created with
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Model to use
    pub model: Model,
    /// System instruction
    pub system_instruction: String,
    /// Sampling settings
    pub generation: GenerationConfig,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: Model::default(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            generation: GenerationConfig {
                temperature: Some(DEFAULT_TEMPERATURE),
                max_output_tokens: None,
            },
        }
    }
}
