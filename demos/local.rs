//! Runs a small API on the local host.
//!
//! ```text
//! RUST_LOG=waypoint=debug cargo run --example local
//! curl 'http://127.0.0.1:3000/hello?name=jott'
//! curl -H 'Authorization: Bearer x' http://127.0.0.1:3000/admin/stats
//! ```

use serde::Deserialize;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use waypoint::{json, Context, Server, ServerConfig};

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut router = waypoint::rest();

    router.pre(|c| c.set("started", Instant::now()));
    router.get("/", |c| c.text(200, "Welcome to waypoint"));
    router.get("/hello", |c| {
        let name = c.query("name").unwrap_or("world").to_string();
        let elapsed = c.get::<Instant>("started").map(|t| t.elapsed().as_micros()).unwrap_or(0);
        c.json(200, &json!({ "message": format!("hello {}", name), "micros": elapsed }));
    });
    router.post("/users", |c| match c.bind::<NewUser>() {
        Ok(user) => c.json(201, &json!({ "created": user.name })),
        Err(err) => c.text(400, format!("invalid body: {}", err)),
    });

    let mut admin = router.group("/admin");
    admin.pre(|c| {
        if c.header("Authorization").map_or(true, |v| !v.starts_with("Bearer ")) {
            c.text(401, "Authentication required");
            c.abort();
        }
    });
    admin.get("/stats", |c| c.json(200, &json!({ "routes": "ok" })));

    router.on_error(|err, c| {
        c.json(err.status_code(), &json!({ "error": { "message": err.to_string() } }));
    });

    Server::new(router)
        .config(ServerConfig::default().max_connections(64))
        .listen("127.0.0.1:3000")
        .expect("Server failed to start");
}
