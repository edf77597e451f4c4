use rs_textgen_core::{CancellationToken, EngineConfig, Generator, Goal, StartSeed};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Corpora are read from "./data" (.dat files), a .bin cache is written
    // next to each one on first load and reused afterwards
    let generator = Generator::from_config(EngineConfig::default())?;

    // Nothing here is ever cancelled, but every request takes a token
    let cancel = CancellationToken::new();

    // Sources known to the loader: the configured ones plus every .dat file
    for source in generator.oracles().loader().sources()? {
        println!("Available source: {}", source);
    }

    // Craziness goes from 0 (always the most likely letter) to 100 (uniform)
    // Out of range values are clamped
    generator.set_temperature(150.0);
    println!("Craziness 150 is stored as {}", generator.temperature());
    generator.set_temperature(10.0);

    // The source is read when a request is built
    generator.set_source("Dr. Seuss");

    // "10 words starting with 'Scratch '", the seed is part of the text
    let words = generator.words("Scratch ", 10, &cancel).await;
    println!("Words: {}", words.display_text());

    // Continue from where the last text ended
    println!("Next word: {}", generator.next_word(&cancel).await.display_text());
    println!("Next sentence: {}", generator.next_sentence(&cancel).await.display_text());

    // Unknown characters in the seed are reported, not generated from
    let failed = generator.characters("\u{2603}", 5, &cancel).await;
    println!("Failed request says: {}", failed.display_text());

    // Lower level: build a request and inspect the result
    generator.set_temperature(0.0);
    let request = generator.request(StartSeed::Custom("The cat ".to_owned()), Goal::chars(40));
    let result = generator.generate_continuation(&request, &cancel).await?;
    println!(
        "Most likely 40 characters: {:?} ({:?}, {} symbols)",
        result.text, result.stop_reason, result.symbols_consumed
    );
    println!("Continuity buffer: {:?}", generator.continuity().await);

    Ok(())
}
