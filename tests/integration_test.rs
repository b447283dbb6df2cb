use hono_openapi_gen::{
    config::GeneratorConfig,
    error::GenError,
    extractor::{combine_paths, hono::HonoExtractor},
    generator::Generator,
    openapi_builder::OpenApiDocument,
    type_resolver::{PathAliases, TypeResolver},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(path)
}

/// Write a config file into `dir` and load it
fn load_config(dir: &TempDir, output: &str, apis: Value) -> GeneratorConfig {
    let config = json!({
        "openapi": "3.0.3",
        "info": { "title": "Acme API", "version": "2.1.0", "description": "Public endpoints" },
        "servers": [{ "url": "https://api.acme.test" }],
        "output": output,
        "apis": apis,
    });
    let path = dir.path().join("openapi.config.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    GeneratorConfig::load(&path).expect("Failed to load config")
}

fn two_group_apis() -> Value {
    json!([
        {
            "name": "api",
            "appTypePath": fixture("prefixed/app.d.ts"),
            "routesPath": fixture("prefixed/routes.ts"),
            "apiPrefix": "/api",
            "api": [
                {
                    "path": "/api/docs/search",
                    "method": "GET",
                    "description": "Full-text search",
                    "tags": ["Y"]
                }
            ]
        },
        {
            "name": "jobs",
            "appTypePath": fixture("mutating/app.ts")
        }
    ])
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("Failed to read output"))
        .expect("Output is not valid JSON")
}

#[test]
fn test_walker_recovers_prefixed_route_entries() {
    let mut resolver = TypeResolver::new(PathAliases::default());
    let module = resolver.add_source_file(&fixture("prefixed/app.d.ts")).unwrap();
    let app_type = resolver.app_type(module, None).unwrap();

    let entries = HonoExtractor::new(&mut resolver)
        .extract(&app_type)
        .unwrap()
        .expect("Route table should not collapse");

    assert_eq!(entries.len(), 5);
    let routes: Vec<String> = entries
        .iter()
        .flat_map(|e| e.literal.members.iter().map(|m| combine_paths(&e.prefix, &m.name)))
        .collect();
    assert_eq!(
        routes,
        vec!["/docs/search", "/docs/:slug", "/users", "/users", "/users/:id"]
    );
}

#[test]
fn test_end_to_end_generation() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_config(&temp_dir, "dist/openapi.json", two_group_apis());

    let summary = Generator::new(config).run().expect("Generation failed");

    assert_eq!(summary.groups, 2);
    assert_eq!(summary.fallback_groups, 1);
    assert_eq!(summary.operations, 8);

    let doc = read_json(&temp_dir.path().join("dist/openapi.json"));
    assert_eq!(doc["openapi"], "3.0.3");
    assert_eq!(doc["info"]["title"], "Acme API");
    assert_eq!(doc["servers"][0]["url"], "https://api.acme.test");
    assert_eq!(doc["tags"], json!([{ "name": "api" }, { "name": "jobs" }]));

    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(
        paths,
        vec![
            "/api/docs/search",
            "/api/docs/{slug}",
            "/api/users",
            "/api/users/{id}",
            "/health",
            "/jobs",
            "/jobs/{id}",
        ]
    );

    // Intermediate documents stay unprefixed
    let api_group = read_json(&temp_dir.path().join("dist/.openapi-groups/api.json"));
    assert!(api_group["paths"]["/docs/search"].is_object());
    assert!(api_group.get("tags").is_none());
}

#[test]
fn test_parameters_and_request_body() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_config(&temp_dir, "openapi.json", two_group_apis());
    Generator::new(config).run().unwrap();
    let doc = read_json(&temp_dir.path().join("openapi.json"));

    let search = &doc["paths"]["/api/docs/search"]["get"];
    assert_eq!(search["parameters"][0]["name"], "q");
    assert_eq!(search["parameters"][0]["in"], "query");
    assert_eq!(search["parameters"][0]["required"], true);
    assert_eq!(search["parameters"][1]["name"], "limit");
    assert_eq!(search["parameters"][1]["required"], false);
    assert!(search.get("requestBody").is_none());

    let delete = &doc["paths"]["/api/users/{id}"]["delete"];
    assert_eq!(
        delete["parameters"],
        json!([
            { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
            { "name": "authorization", "in": "header", "required": true, "schema": { "type": "string" } }
        ])
    );

    let create = &doc["paths"]["/api/users"]["post"];
    assert_eq!(create["requestBody"]["required"], true);
    let body = &create["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(body["type"], "object");
    assert_eq!(
        body["properties"]["role"],
        json!({ "type": "string", "enum": ["admin", "member", "guest"] })
    );
    assert_eq!(body["required"], json!(["name", "role"]));
}

#[test]
fn test_responses_grouped_by_status() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_config(&temp_dir, "openapi.json", two_group_apis());
    Generator::new(config).run().unwrap();
    let doc = read_json(&temp_dir.path().join("openapi.json"));

    let read = &doc["paths"]["/api/docs/{slug}"]["get"]["responses"];
    assert_eq!(read["200"]["description"], "OK");
    assert_eq!(read["200"]["content"]["text/plain"]["schema"], json!({ "type": "string" }));
    assert_eq!(read["404"]["description"], "Not Found");
    assert_eq!(
        read["404"]["content"]["application/json"]["schema"]["required"],
        json!(["error", "code"])
    );

    let list = &doc["paths"]["/api/users"]["get"]["responses"]["200"]["content"]["application/json"]["schema"];
    assert_eq!(list["type"], "array");
    let user = &list["items"];
    for field in ["id", "createdAt", "name", "role", "email"] {
        assert!(user["properties"].get(field).is_some(), "User schema misses {}", field);
    }
    assert!(!user["required"].as_array().unwrap().contains(&json!("email")));

    let created = &doc["paths"]["/api/users"]["post"]["responses"];
    let statuses: Vec<&String> = created.as_object().unwrap().keys().collect();
    assert_eq!(statuses, vec!["201", "400"]);

    let deleted = &doc["paths"]["/api/users/{id}"]["delete"]["responses"]["204"];
    assert_eq!(deleted, &json!({ "description": "No Content" }));
}

#[test]
fn test_documentation_precedence() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_config(&temp_dir, "openapi.json", two_group_apis());
    Generator::new(config).run().unwrap();
    let doc = read_json(&temp_dir.path().join("openapi.json"));
    let paths = &doc["paths"];

    // Manual override beats the inline marker
    let search = &paths["/api/docs/search"]["get"];
    assert_eq!(search["tags"], json!(["Y"]));
    assert_eq!(search["summary"], "Search documents");
    assert_eq!(search["description"], "Full-text search");

    // Inline marker beats the group name
    let read = &paths["/api/docs/{slug}"]["get"];
    assert_eq!(read["tags"], json!(["docs"]));
    assert_eq!(
        read["description"],
        "Returns the raw document text.\n\nUnknown slugs answer 404."
    );

    // Marker without tags falls back to the group name
    let list = &paths["/api/users"]["get"];
    assert_eq!(list["summary"], "List users");
    assert_eq!(list["deprecated"], true);
    assert_eq!(list["tags"], json!(["api"]));
    assert_eq!(paths["/api/users"]["post"]["summary"], "Create a user");

    // No documentation at all
    let delete = &paths["/api/users/{id}"]["delete"];
    assert_eq!(delete["summary"], "Auto-generated DELETE /users/{id}");
    assert_eq!(delete["tags"], json!(["api"]));
}

#[test]
fn test_fallback_routes_from_source_text() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_config(&temp_dir, "openapi.yaml", two_group_apis());
    Generator::new(config).run().unwrap();

    let content = fs::read_to_string(temp_dir.path().join("openapi.yaml")).unwrap();
    let doc: OpenApiDocument = serde_yaml::from_str(&content).expect("Output is not valid YAML");

    let health = doc.paths["/health"].get.as_ref().unwrap();
    assert_eq!(health.summary.as_deref(), Some("Health check"));
    assert_eq!(health.tags, Some(vec!["jobs".to_string()]));

    for (path, operation) in [
        ("/jobs", doc.paths["/jobs"].post.as_ref()),
        ("/jobs/{id}", doc.paths["/jobs/{id}"].get.as_ref()),
    ] {
        let operation = operation.unwrap_or_else(|| panic!("Missing operation for {}", path));
        assert!(operation.parameters.is_empty());
        assert!(operation.request_body.is_none());
        let statuses: Vec<&String> = operation.responses.keys().collect();
        assert_eq!(statuses, vec!["default"]);
        assert_eq!(operation.responses["default"].description, "Default response");
    }
}

#[test]
fn test_merge_is_byte_identical_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("openapi.json");
    let config = load_config(&temp_dir, "openapi.json", two_group_apis());

    let mut generator = Generator::new(config.clone());
    generator.run().unwrap();
    let first = fs::read(&output).unwrap();

    // Merge the same intermediate files again
    let merged = generator.merge().unwrap();
    assert_eq!(
        serde_json::to_string_pretty(&merged).unwrap().into_bytes(),
        first
    );

    // A fresh session over the same sources produces the same bytes
    Generator::new(config).run().unwrap();
    assert_eq!(fs::read(&output).unwrap(), first);
}

#[test]
fn test_missing_group_file_is_skipped_during_merge() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_config(&temp_dir, "openapi.json", two_group_apis());

    let generator = Generator::new(config);
    // Nothing has been generated yet: both intermediate files are missing
    let merged = generator.merge().unwrap();

    assert!(merged.paths.is_empty());
    let tags: Vec<String> = merged.tags.unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(tags, vec!["api", "jobs"]);
}

#[test]
fn test_excluded_paths_are_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let apis = json!([
        {
            "name": "api",
            "appTypePath": fixture("prefixed/app.d.ts"),
            "routesPath": fixture("prefixed/routes.ts"),
            "apiPrefix": "/api",
            "excludePaths": ["/api/users/:id", { "pattern": "^/api/docs/" }]
        }
    ]);
    let config = load_config(&temp_dir, "openapi.json", apis);
    Generator::new(config).run().unwrap();

    let doc = read_json(&temp_dir.path().join("openapi.json"));
    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(paths, vec!["/api/users"]);
}

#[test]
fn test_unsupported_route_shape_aborts_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let apis = json!([
        { "name": "broken", "appTypePath": fixture("unsupported/app.d.ts") },
        { "name": "jobs", "appTypePath": fixture("mutating/app.ts") }
    ]);
    let config = load_config(&temp_dir, "openapi.json", apis);

    let error = Generator::new(config).run().unwrap_err();

    match error.downcast_ref::<GenError>() {
        Some(GenError::UnsupportedRouteShape { kind, text }) => {
            assert_eq!(kind, "ArrayType");
            assert_eq!(text, "string[]");
        }
        other => panic!("Unexpected error: {:?}", other),
    }
    assert!(format!("{:#}", error).contains("Failed to generate group `broken`"));
    assert!(!temp_dir.path().join("openapi.json").exists());
}

#[test]
fn test_broken_documentation_source_is_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let broken = temp_dir.path().join("broken.ts");
    fs::write(&broken, "app.get('/search', describeRoute({ summary: ").unwrap();
    let apis = json!([
        {
            "name": "api",
            "appTypePath": fixture("prefixed/app.d.ts"),
            "routesPath": broken,
        }
    ]);
    let config = load_config(&temp_dir, "openapi.json", apis);

    Generator::new(config).run().unwrap();

    let doc = read_json(&temp_dir.path().join("openapi.json"));
    let search = &doc["paths"]["/docs/search"]["get"];
    assert_eq!(search["summary"], "Auto-generated GET /docs/search");
    assert_eq!(search["tags"], json!(["api"]));
}

#[test]
fn test_invalid_config_is_rejected_before_generation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("openapi.config.yaml");
    fs::write(
        &path,
        "info:\n  title: T\n  version: '1'\noutput: out.json\napis:\n  - name: a\n    appTypePath: missing.ts\n",
    )
    .unwrap();

    let error = GeneratorConfig::load(&path).unwrap_err();

    assert!(matches!(error, GenError::Config(_)), "{:?}", error);
}
