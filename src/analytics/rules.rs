//! Deterministic rule-based call analytics.
//!
//! Always available; the fallback whenever the remote coach cannot be used.

use regex::Regex;

use crate::meeting::records::TranscriptBlock;

const FILLER_WORDS: [&str; 8] = ["um", "uh", "you know", "like", "hmm", "erm", "ah", "so"];

/// Talk-ratio percentage above which the dominant speaker gets a balance
/// warning.
const DOMINANCE_THRESHOLD: f64 = 60.0;

const MIN_QUESTIONS: usize = 3;

const MAX_FILLERS: usize = 5;

struct SpeakerStats {
    name: String,
    word_count: usize,
    question_count: usize,
    filler_count: usize,
}

pub fn rule_based_analytics(transcript: &[TranscriptBlock]) -> String {
    if transcript.is_empty() {
        return "No transcript data available to generate analytics.".to_string();
    }

    let fillers: Vec<Regex> = FILLER_WORDS
        .iter()
        .map(|word| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).expect("valid filler pattern")
        })
        .collect();

    // First-seen order, matching how participants joined the conversation
    let mut stats: Vec<SpeakerStats> = Vec::new();
    for block in transcript {
        let name = if block.person_name.is_empty() {
            "Unknown"
        } else {
            block.person_name.as_str()
        };

        let index = match stats.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                stats.push(SpeakerStats {
                    name: name.to_string(),
                    word_count: 0,
                    question_count: 0,
                    filler_count: 0,
                });
                stats.len() - 1
            }
        };
        let entry = &mut stats[index];

        entry.word_count += block.transcript_text.split_whitespace().count();
        entry.question_count += block.transcript_text.matches('?').count();
        for filler in &fillers {
            entry.filler_count += filler.find_iter(&block.transcript_text).count();
        }
    }

    let total_words = stats.iter().map(|s| s.word_count).sum::<usize>().max(1);

    let mut out = String::from("PARTICIPANTS ANALYSIS\n\n");
    for speaker in &stats {
        let ratio = speaker.word_count as f64 / total_words as f64 * 100.0;
        out.push_str(&format!(
            "{}:\n  Talk Ratio: {:.1}%\n  Questions Asked: {}\n  Filler Words: {}\n\n",
            speaker.name, ratio, speaker.question_count, speaker.filler_count
        ));
    }

    // First speaker wins ties, same as insertion order above
    let mut dominant = &stats[0];
    for speaker in &stats[1..] {
        if speaker.word_count > dominant.word_count {
            dominant = speaker;
        }
    }
    let dominant_ratio = dominant.word_count as f64 / total_words as f64 * 100.0;

    out.push_str("COACHING INSIGHTS\n\n");

    if dominant_ratio > DOMINANCE_THRESHOLD {
        out.push_str(&format!(
            "- {} spoke {:.1}% of the time. Consider encouraging more two-way dialogue.\n",
            dominant.name, dominant_ratio
        ));
    } else {
        out.push_str("- Good balance of talk time among participants.\n");
    }

    for speaker in &stats {
        if speaker.question_count < MIN_QUESTIONS {
            out.push_str(&format!(
                "- {} asked only {} question(s). Try incorporating more open-ended questions.\n",
                speaker.name, speaker.question_count
            ));
        }
    }

    for speaker in &stats {
        if speaker.filler_count > MAX_FILLERS {
            out.push_str(&format!(
                "- {} used {} filler words. Practice concise messaging.\n",
                speaker.name, speaker.filler_count
            ));
        }
    }

    out
}
