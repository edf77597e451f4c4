use std::env;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::{Deserialize, Serialize};

use rs_textgen_core::oracle::ngram::NGramLoader;
use rs_textgen_core::{CancellationToken, EngineConfig, GenerationOutcome, Generator, SessionState};

type Engine = web::Data<Generator<NGramLoader>>;

/// Query parameters for the `/v1/words` and `/v1/characters` endpoints
#[derive(Deserialize)]
struct BlockParams {
	length: Option<usize>,
	seed: Option<String>
}

#[derive(Deserialize)]
struct CrazinessQuery {
	value: Option<f32>
}

#[derive(Deserialize)]
struct SourceQuery {
	name: Option<String>
}

#[derive(Serialize)]
struct Craziness {
	value: f32
}

#[derive(Serialize)]
struct Source {
	name: String
}

#[derive(Serialize)]
struct EngineState {
	state: SessionState,
	source: String,
	craziness: f32,
	loaded: bool
}

impl BlockParams {
	fn length(&self) -> usize {
		self.length.unwrap_or(10)
	}

	fn seed(&self) -> String {
		self.seed.clone().unwrap_or_else(|| "Scratch ".to_owned())
	}
}

/// Runs a generation block as its own task.
///
/// If the client goes away the handler future is dropped, the guard fires and
/// the task stops at its next step without touching the continuity buffer.
async fn run_block<F, Fut>(engine: Engine, block: F) -> HttpResponse
where
	F: FnOnce(Engine, CancellationToken) -> Fut,
	Fut: Future<Output = GenerationOutcome> + 'static,
{
	let cancel = CancellationToken::new();
	let _disconnect = cancel.clone().drop_guard();

	match actix_web::rt::spawn(block(engine, cancel)).await {
		Ok(outcome) => HttpResponse::Ok().json(outcome),
		Err(e) => {
			error!("Generation task failed: {e}");
			HttpResponse::InternalServerError().body("Generation task failed")
		}
	}
}

/// HTTP GET endpoint `/v1/words`
///
/// `length` words starting with `seed`. The returned text includes the seed.
#[get("/v1/words")]
async fn get_words(engine: Engine, query: web::Query<BlockParams>) -> impl Responder {
	let (seed, length) = (query.seed(), query.length());
	run_block(engine, move |engine, cancel| async move { engine.words(&seed, length, &cancel).await }).await
}

/// HTTP GET endpoint `/v1/characters`
///
/// `length` characters continuing `seed`, seed excluded.
#[get("/v1/characters")]
async fn get_characters(engine: Engine, query: web::Query<BlockParams>) -> impl Responder {
	let (seed, length) = (query.seed(), query.length());
	run_block(engine, move |engine, cancel| async move { engine.characters(&seed, length, &cancel).await }).await
}

#[get("/v1/next_word")]
async fn get_next_word(engine: Engine) -> impl Responder {
	run_block(engine, |engine, cancel| async move { engine.next_word(&cancel).await }).await
}

#[get("/v1/next_sentence")]
async fn get_next_sentence(engine: Engine) -> impl Responder {
	run_block(engine, |engine, cancel| async move { engine.next_sentence(&cancel).await }).await
}

#[get("/v1/craziness")]
async fn get_craziness(engine: Engine) -> impl Responder {
	HttpResponse::Ok().json(Craziness { value: engine.temperature() })
}

/// Out of range values are clamped, the stored value is returned.
#[put("/v1/craziness")]
async fn put_craziness(engine: Engine, query: web::Query<CrazinessQuery>) -> impl Responder {
	let value = match query.value {
		Some(v) => v,
		None => return HttpResponse::BadRequest().body("Missing craziness value"),
	};
	engine.set_temperature(value);
	HttpResponse::Ok().json(Craziness { value: engine.temperature() })
}

#[get("/v1/source")]
async fn get_source(engine: Engine) -> impl Responder {
	HttpResponse::Ok().json(Source { name: engine.source() })
}

#[put("/v1/source")]
async fn put_source(engine: Engine, query: web::Query<SourceQuery>) -> impl Responder {
	let name = match &query.name {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty source name"),
	};

	if let Err(e) = engine.oracles().loader().resolve(name) {
		return HttpResponse::NotFound().body(e.to_string());
	}
	engine.set_source(name);
	info!("Source set to {name:?}");
	HttpResponse::Ok().json(Source { name: name.to_owned() })
}

#[get("/v1/sources")]
async fn get_sources(engine: Engine) -> impl Responder {
	match engine.oracles().loader().sources() {
		Ok(sources) => HttpResponse::Ok().json(sources),
		Err(e) => {
			error!("Failed to list sources: {e}");
			HttpResponse::InternalServerError().body("Failed to list sources")
		}
	}
}

#[get("/v1/state")]
async fn get_state(engine: Engine) -> impl Responder {
	let source = engine.source();
	HttpResponse::Ok().json(EngineState {
		state: engine.state(),
		loaded: engine.oracles().is_loaded(&source),
		craziness: engine.temperature(),
		source,
	})
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(get_words)
		.service(get_characters)
		.service(get_next_word)
		.service(get_next_sentence)
		.service(get_craziness)
		.service(put_craziness)
		.service(get_source)
		.service(put_source)
		.service(get_sources)
		.service(get_state);
}

/// Main entry point for the server.
///
/// Reads the engine configuration from the JSON file named by `TEXTGEN_CONFIG`
/// (defaults otherwise) and listens on `TEXTGEN_BIND` (127.0.0.1:5000).
/// Scoring models are loaded on first use.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = match env::var("TEXTGEN_CONFIG") {
		Ok(path) => EngineConfig::from_file(&path).map_err(std::io::Error::other)?,
		Err(_) => EngineConfig::default(),
	};
	let engine = web::Data::new(Generator::from_config(config).map_err(std::io::Error::other)?);
	let bind = env::var("TEXTGEN_BIND").unwrap_or_else(|_| "127.0.0.1:5000".to_owned());
	info!("Listening on {bind}");

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(engine.clone())
			.configure(routes)
	})
		.bind(bind)?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use actix_web::test;
	use rs_textgen_core::CorpusConfig;
	use serde_json::Value;

	use super::*;

	fn engine(folder: &Path) -> Engine {
		std::fs::write(folder.join("seuss.dat"), "the cat sat on the mat.\nthe cat is fat.\n".repeat(20)).unwrap();
		let config = EngineConfig {
			rng_seed: Some(3),
			corpus: CorpusConfig { folder: folder.to_path_buf(), max_order: 4, ..CorpusConfig::default() },
			..EngineConfig::default()
		};
		web::Data::new(Generator::from_config(config).unwrap())
	}

	#[actix_web::test]
	async fn words_start_with_the_seed() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(App::new().app_data(engine(dir.path())).configure(routes)).await;

		let req = test::TestRequest::get().uri("/v1/words?length=2&seed=the%20").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["status"], "ok");
		assert!(body["text"].as_str().unwrap().starts_with("the "));

		let req = test::TestRequest::get().uri("/v1/next_word").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["status"], "ok");
	}

	#[actix_web::test]
	async fn unknown_characters_return_a_fallback() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(App::new().app_data(engine(dir.path())).configure(routes)).await;

		let req = test::TestRequest::get().uri("/v1/characters?length=3&seed=%E2%98%83").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["status"], "error");
		assert_eq!(body["kind"], "encoding");
		assert!(!body["fallback"].as_str().unwrap().is_empty());
	}

	#[actix_web::test]
	async fn craziness_is_clamped() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(App::new().app_data(engine(dir.path())).configure(routes)).await;

		let req = test::TestRequest::get().uri("/v1/craziness").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["value"], 10.0);

		let req = test::TestRequest::put().uri("/v1/craziness?value=250").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["value"], 100.0);

		let req = test::TestRequest::put().uri("/v1/craziness").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), 400);
	}

	#[actix_web::test]
	async fn sources_can_be_listed_and_selected() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(App::new().app_data(engine(dir.path())).configure(routes)).await;

		let req = test::TestRequest::get().uri("/v1/sources").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body, serde_json::json!(["Dr. Seuss", "seuss"]));

		let req = test::TestRequest::put().uri("/v1/source?name=Shakespeare").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), 404);

		let req = test::TestRequest::put().uri("/v1/source?name=seuss").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["name"], "seuss");

		let req = test::TestRequest::get().uri("/v1/state").to_request();
		let body: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(body["state"], "idle");
		assert_eq!(body["source"], "seuss");
		assert_eq!(body["loaded"], false);
	}
}
