//! Prompts for remote OCR and for transcript normalization.
//!
//! Every instruction sent to a hosted model lives here so prompt wording can
//! be changed in one place and inspected by unit tests without a provider.
//! [`build_normalize_prompt`] is a pure function; the network call lives in
//! [`crate::pipeline::normalize`].

/// Instruction sent with the image for remote extraction.
pub const OCR_INSTRUCTION: &str = "Extract all text from this image. \
Fix minor grammar and spelling mistakes introduced by handwriting or scanning, \
but do not change the meaning. Keep mathematical notation as written. \
Return only the text, with no commentary.";

/// Normalization instruction when the service produces LaTeX.
pub const LATEX_INSTRUCTION: &str = r#"You are a helpful LaTeX text formatting assistant.
Take the raw OCR output below and return a clean, well-formatted version as LaTeX code.

Rules:
- Output valid LaTeX only, as a complete document from \documentclass to \end{document}
- Do NOT add explanations or extra text before or after the code
- Do NOT include literal '\n' sequences or other escape sequences; use real line breaks, and '\\' where LaTeX needs a forced break
- Preserve all math formatting and special symbols
- Do NOT wrap the output in ``` fences
Return only the LaTeX code."#;

/// Normalization instruction when the service produces cleaned prose.
pub const PROSE_INSTRUCTION: &str = "You are a helpful text formatting assistant.
Take the raw OCR output below and return a clean, well-formatted version.
Normalise spacing and line breaks and improve readability without changing the meaning.
Do NOT add explanations. Return only the cleaned text.";

/// Example document shown to the model as a formatting reference.
pub const EXAMPLE_LATEX_TEMPLATE: &str = r#"\documentclass[11pt]{article}
\usepackage[margin=1in]{geometry}
\usepackage{amsmath}
\usepackage{amssymb}
\usepackage{enumitem}

\title{Assignment}
\author{}
\date{}

\begin{document}
\maketitle

\section*{Problem 1}
Prove that \( \sum_{i=1}^{n} i = \frac{n(n+1)}{2} \) for every integer \( n \geq 1 \).

\subsection*{Solution}
We proceed by induction on \( n \).
\begin{align*}
\sum_{i=1}^{k+1} i &= (k + 1) + \sum_{i=1}^{k} i \\
&= (k + 1) + \frac{k(k + 1)}{2} \\
&= \frac{(k + 1)(k + 2)}{2}
\end{align*}

\begin{enumerate}[label=(\alph*)]
  \item First part of the answer.
  \item Second part of the answer.
\end{enumerate}

\end{document}"#;

/// Assemble the single user message sent for normalization.
///
/// Layout: instruction, optional example section, then the transcript between
/// `INPUT:` and `OUTPUT:` markers so the model continues right after the
/// latter.
pub fn build_normalize_prompt(instruction: &str, example: Option<&str>, transcript: &str) -> String {
    let mut prompt = String::with_capacity(
        instruction.len() + example.map_or(0, str::len) + transcript.len() + 128,
    );
    prompt.push_str(instruction.trim_end());
    prompt.push_str("\n\n");
    if let Some(example) = example {
        prompt.push_str("Here is an example template you can follow for general LaTeX guidelines:\n");
        prompt.push_str(example);
        prompt.push_str("\n\n");
    }
    prompt.push_str("INPUT:\n");
    prompt.push_str(transcript);
    prompt.push_str("\n\nOUTPUT:\n");
    prompt
}
