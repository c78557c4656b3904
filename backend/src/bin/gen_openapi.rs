use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Write the derived ApiDoc to openapi.json for the frontend client generator
    let spec = kubeview_backend::api::openapi::ApiDoc::openapi();
    let json = serde_json::to_string_pretty(&spec)?;
    std::fs::write("openapi.json", json)?;
    println!("Wrote openapi.json");
    Ok(())
}
