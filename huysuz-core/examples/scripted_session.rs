//! Runs a full scripted session arc offline and prints the transcript.
//!
//! Run with: `cargo run -p huysuz-core --example scripted_session`

use huysuz_core::{GameStatus, Gender, Sender, TestHarness, BLOCK_DELAY, OPENING_DELAY};

fn print_transcript(harness: &TestHarness) {
    for message in harness.state.messages() {
        let who = match message.sender {
            Sender::User => "sen",
            Sender::Partner => "partner",
        };
        println!("  [{who}] {}", message.text);
    }
}

fn main() {
    let mut harness = TestHarness::new();

    harness
        .expect_reply("Hı. Geldin demek.", 15)
        .expect_reply("Geçen haftaki konuyu hiç açmayacak mısın?", 35)
        .expect_reply("Tamam. Ben de öyle düşünüyordum zaten.", 25)
        .expect_reply("Yeter. Seni engelliyorum.", 40);

    harness.choose_partner(Gender::Female);
    println!("partner seçildi: {}", harness.state.partner().unwrap().name);

    harness.advance(OPENING_DELAY);
    println!("\naçılış mesajı geldi:");
    print_transcript(&harness);

    for text in [
        "Selam, napıyorsun?",
        "Bir şey mi oldu?",
        "Ben mi bir şey yaptım yine?",
        "Tamam, sakin ol lütfen",
    ] {
        let level = harness.send(text).expect("scripted turn");
        println!("\n> {text}  (sinir: {level}/100)");
        println!("< {}", harness.last_text().unwrap());
    }

    harness.advance(BLOCK_DELAY);
    assert_eq!(harness.state.status(), GameStatus::Blocked);

    println!("\n--- ENGELLENDİN ---");
    println!("toplam mesaj: {}", harness.state.message_count());
    println!("final transcript:");
    print_transcript(&harness);
}
