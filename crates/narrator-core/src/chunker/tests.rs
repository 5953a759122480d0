use super::*;

fn words_para(word: &str, n: usize) -> String {
    vec![word; n].join(" ")
}

#[test]
fn three_paragraphs_do_not_pair_under_600() {
    let para = words_para("alpha", 400);
    let text = format!("{para}\n\n{para}\n\n{para}");
    let units = chunk(&text, 600, &WordCounter);
    assert_eq!(units.len(), 3);
    for (i, u) in units.iter().enumerate() {
        assert_eq!(u.index, i);
        assert_eq!(u.tokens, 400);
        assert_eq!(u.text, para);
    }
}

#[test]
fn three_paragraphs_pair_greedily_under_800() {
    let para = words_para("beta", 400);
    let text = format!("{para}\n\n{para}\n\n{para}");
    let units = chunk(&text, 800, &WordCounter);
    assert_eq!(units.len(), 2);
    assert_eq!(units[0].tokens, 800);
    assert_eq!(units[0].text, format!("{para}\n\n{para}"));
    assert_eq!(units[1].tokens, 400);
}

#[test]
fn single_huge_sentence_falls_back_to_words() {
    let text = "Word ".repeat(13000);
    let report = chunk_with_report(&text, 2000, &WordCounter);
    assert_eq!(report.units.len(), 7);
    assert!(report.oversized.is_empty());
    for u in &report.units[..6] {
        assert_eq!(u.tokens, 2000);
    }
    assert_eq!(report.units[6].tokens, 1000);
    assert_eq!(report.total_tokens(), 13000);
}

#[test]
fn oversized_paragraph_is_packed_by_sentences() {
    let text = "One two three. Four five six. Seven eight nine.";
    let units = chunk(text, 6, &WordCounter);
    let texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
    assert_eq!(texts, vec!["One two three. Four five six.", "Seven eight nine."]);
}

#[test]
fn empty_and_whitespace_only_input_yields_no_units() {
    assert!(chunk("", 100, &WordCounter).is_empty());
    assert!(chunk("  \n\n \t \n", 100, &WordCounter).is_empty());
}

#[test]
fn small_document_is_a_single_unit() {
    let counter = Cl100kCounter::new().unwrap();
    let units = chunk("Hello there.\n\nGeneral Kenobi.", 1000, &counter);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].text, "Hello there.\n\nGeneral Kenobi.");
}

#[test]
fn single_word_larger_than_budget_is_reported_not_dropped() {
    let text = "a supercalifragilisticexpialidocious b";
    let report = chunk_with_report(text, 2, &Cl100kCounter::new().unwrap());
    assert!(!report.oversized.is_empty());
    let joined: Vec<&str> = report.units.iter().map(|u| u.text.as_str()).collect();
    assert!(joined.iter().any(|t| t.contains("supercalifragilisticexpialidocious")));
}

#[test]
fn every_unit_respects_budget_with_cl100k_counter() {
    let counter = Cl100kCounter::new().unwrap();
    let mut text = String::new();
    for p in 0..40 {
        for s in 0..(p % 7 + 1) {
            text.push_str(&format!(
                "Paragraph {p} sentence {s} talks about things, at length; truly. "
            ));
        }
        text.push_str("\n\n");
    }
    // Budgets at or above one sentence, so joined candidates are measured exactly.
    for budget in [25, 60, 200] {
        let report = chunk_with_report(&text, budget, &counter);
        assert!(report.oversized.is_empty(), "budget {budget}");
        for u in &report.units {
            assert!(u.tokens <= budget, "budget {budget}, unit {} = {}", u.index, u.tokens);
            assert_eq!(u.tokens, counter.count(&u.text));
        }
    }
}

#[test]
fn chunking_is_deterministic() {
    let text = "First para here.\n\nSecond para, longer. It has two sentences!\n\nThird.";
    let counter = Cl100kCounter::new().unwrap();
    let a = chunk(text, 5, &counter);
    let b = chunk(text, 5, &counter);
    assert_eq!(a, b);
}

#[test]
fn zero_budget_is_treated_as_one() {
    let units = chunk("a b c", 0, &WordCounter);
    assert_eq!(units.len(), 3);
}
