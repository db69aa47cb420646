//! Prompt Composer - persona, context and question in one prompt

use super::intent::Intent;

pub const PERSONA_NETWORK_SUPPORT: &str =
    "Anda adalah customer service yang ramah dan responsif untuk layanan jaringan.";
pub const PERSONA_SALES: &str =
    "Anda adalah asisten penjualan yang ramah dan informatif untuk produk retail.";
pub const PERSONA_GENERIC: &str = "Anda adalah asisten virtual yang ramah dan membantu.";

pub const SECTION_SEPARATOR: &str = "---";

pub const CLOSING_INSTRUCTION: &str = "Berikan jawaban yang ramah, informatif, dan ringkas berdasarkan konteks yang diberikan. \
Jika konteks dari database tidak memberikan informasi yang cukup, katakan bahwa Anda tidak memiliki data spesifik atau butuh informasi lebih lanjut.";

#[derive(Debug, Default, Clone, Copy)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    /// Role preamble for an intent
    pub fn persona(intent: Intent) -> &'static str {
        match intent {
            Intent::CheckDeviceStatus => PERSONA_NETWORK_SUPPORT,
            Intent::GetProductPrice => PERSONA_SALES,
            Intent::Unknown => PERSONA_GENERIC,
        }
    }

    /// Assemble the prompt; an empty context line is left out
    pub fn compose(&self, intent: Intent, context: &str, question: &str) -> String {
        let question = format!("Pertanyaan Pengguna: {}", question);
        let parts = [
            Self::persona(intent),
            context,
            SECTION_SEPARATOR,
            question.as_str(),
            SECTION_SEPARATOR,
            CLOSING_INSTRUCTION,
        ];

        parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<&str>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_with_context() {
        let prompt = PromptComposer::new().compose(
            Intent::GetProductPrice,
            "Konteks: Informasi produk Laptop A.",
            "Berapa harga laptop A?",
        );

        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(
            lines,
            vec![
                PERSONA_SALES,
                "Konteks: Informasi produk Laptop A.",
                "---",
                "Pertanyaan Pengguna: Berapa harga laptop A?",
                "---",
                CLOSING_INSTRUCTION,
            ]
        );
    }

    #[test]
    fn test_empty_context_is_omitted() {
        let prompt = PromptComposer::new().compose(Intent::Unknown, "", "Halo");

        assert!(prompt.starts_with(&format!("{}\n---\n", PERSONA_GENERIC)));
        assert_eq!(prompt.lines().count(), 5);
    }

    #[test]
    fn test_multiline_context_kept_verbatim() {
        let context = "Konteks: Berikut adalah status beberapa perangkat OLT:\n- OLT-BDG-001: Online";
        let prompt = PromptComposer::new().compose(Intent::CheckDeviceStatus, context, "status olt");

        assert!(prompt.starts_with(PERSONA_NETWORK_SUPPORT));
        assert!(prompt.contains(context));
    }

    #[test]
    fn test_one_persona_per_intent() {
        assert_eq!(PromptComposer::persona(Intent::CheckDeviceStatus), PERSONA_NETWORK_SUPPORT);
        assert_eq!(PromptComposer::persona(Intent::GetProductPrice), PERSONA_SALES);
        assert_eq!(PromptComposer::persona(Intent::Unknown), PERSONA_GENERIC);
    }
}
