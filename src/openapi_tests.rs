use crate::schemas::ApiDoc;
use utoipa::openapi::{schema::Schema, PathItemType, RefOr};
use utoipa::OpenApi;

fn object_properties(name: &str) -> Vec<String> {
    let openapi = ApiDoc::openapi();
    let components = openapi.components.expect("components should be generated");
    match components.schemas.get(name) {
        Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
        _ => panic!("{} should be an object schema", name),
    }
}

#[test]
fn test_openapi_schema_generation() {
    let openapi = ApiDoc::openapi();

    let components = openapi.components.as_ref().unwrap();
    for name in ["ErrorResponse", "HealthResponse", "CompanyAdmin", "CompanyPublic", "ProductDto", "TransactionDto"] {
        assert!(components.schemas.contains_key(name), "missing schema {}", name);
    }

    assert!(serde_json::to_string(&openapi).is_ok());
}

#[test]
fn test_error_response_schema_structure() {
    let properties = object_properties("ErrorResponse");
    for field in ["error", "code", "success", "fields"] {
        assert!(properties.contains(&field.to_string()), "ErrorResponse lacks {}", field);
    }
}

#[test]
fn test_company_schemas_expose_their_shapes() {
    let admin = object_properties("CompanyAdmin");
    for field in ["code", "id", "name", "owner_groups", "total_products"] {
        assert!(admin.contains(&field.to_string()), "CompanyAdmin lacks {}", field);
    }

    let public = object_properties("CompanyPublic");
    assert_eq!(public.len(), 2);
    assert!(public.contains(&"code".to_string()));
    assert!(public.contains(&"name".to_string()));
}

#[test]
fn test_company_paths_and_methods() {
    let openapi = ApiDoc::openapi();

    let collection = openapi.paths.paths.get("/api/companies").expect("/api/companies");
    assert!(collection.operations.contains_key(&PathItemType::Get));
    assert!(collection.operations.contains_key(&PathItemType::Post));

    let item = openapi
        .paths
        .paths
        .get("/api/companies/{code}")
        .expect("/api/companies/{code}");
    for (method, name) in [
        (PathItemType::Get, "GET"),
        (PathItemType::Put, "PUT"),
        (PathItemType::Patch, "PATCH"),
        (PathItemType::Delete, "DELETE"),
    ] {
        assert!(item.operations.contains_key(&method), "missing {}", name);
    }

    let delete = &item.operations[&PathItemType::Delete];
    assert!(delete.responses.responses.contains_key("409"));
}

#[test]
fn test_all_documented_paths() {
    let openapi = ApiDoc::openapi();
    for path in [
        "/health",
        "/api/companies/{code}/products",
        "/api/companies/{code}/products/{product_code}",
        "/api/products",
        "/api/transactions",
        "/api/transactions/{code}",
    ] {
        assert!(openapi.paths.paths.contains_key(path), "missing path {}", path);
    }
}

#[test]
fn test_error_references_are_well_formed() {
    let openapi_json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

    assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
    assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
    assert!(openapi_json.contains("#/components/schemas/ErrorResponse"));
}
