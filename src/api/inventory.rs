//! Inventory endpoints
//!
//! The inventory page plus the add/edit/delete/image form handlers. Image
//! uploads arrive as multipart form data, are validated against the
//! configured MIME allow-list and size cap, and are stored under the static
//! uploads directory with a randomized filename. When an image is replaced,
//! the file that is no longer referenced is deleted best-effort.

use axum::{
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;
use uuid::Uuid;

use crate::api::middleware::{AppError, AppState, CurrentUser};
use crate::config::UploadConfig;
use crate::models::{CreateProductInput, UpdateProductInput};
use crate::services::InventoryError;

/// Form body for POST /inventory/{id}/edit
#[derive(Debug, Deserialize)]
pub struct EditProductForm {
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

/// GET /inventory
pub async fn inventory_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let products = state
        .inventory_service
        .list(user.uid)
        .await?;

    let mut ctx = TeraContext::new();
    ctx.insert("products", &products);
    Ok(Html(state.templates.render("inventory.html", &ctx)?))
}

/// POST /inventory/add
///
/// Multipart form: name, price, stock, optional image file.
pub async fn add_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let Some(fields) = read_product_form(multipart, &state.upload_config).await? else {
        // Unparsable numbers or a rejected file: back to the page
        return Ok(Redirect::to("/inventory").into_response());
    };

    let image_path = match fields.image {
        Some(image) => Some(store_upload(&state.upload_config, &image).await?),
        None => None,
    };

    let input = CreateProductInput {
        name: fields.name,
        price: fields.price,
        stock: fields.stock,
        image_path,
    };

    match state.inventory_service.add(user.uid, input).await {
        Ok(_) | Err(InventoryError::ValidationError(_)) => {
            Ok(Redirect::to("/inventory").into_response())
        }
        Err(e) => Err(AppError::from(e)),
    }
}

/// POST /inventory/{id}/edit
pub async fn edit_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<i64>,
    Form(form): Form<EditProductForm>,
) -> Result<Redirect, AppError> {
    let input = UpdateProductInput {
        name: form.name,
        price: form.price,
        stock: form.stock,
    };

    match state.inventory_service.edit(user.uid, product_id, input).await {
        // Unknown product or bad values: silently back to the page
        Ok(()) | Err(InventoryError::NotFound) | Err(InventoryError::ValidationError(_)) => {
            Ok(Redirect::to("/inventory"))
        }
        Err(e) => Err(AppError::from(e)),
    }
}

/// POST /inventory/{id}/delete
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<i64>,
) -> Result<Redirect, AppError> {
    match state.inventory_service.delete(user.uid, product_id).await {
        Ok(()) | Err(InventoryError::NotFound) => Ok(Redirect::to("/inventory")),
        Err(e) => Err(AppError::from(e)),
    }
}

/// POST /inventory/{id}/image
///
/// Multipart form with a single "image" file field. Replaces the product's
/// image and deletes the previously stored file.
pub async fn update_product_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read multipart field: {}", e))?
    {
        if field.name() == Some("image") {
            upload = read_image_field(field, &state.upload_config).await?;
        }
    }

    let Some(upload) = upload else {
        return Ok(Redirect::to("/inventory"));
    };

    let new_path = store_upload(&state.upload_config, &upload).await?;

    match state
        .inventory_service
        .replace_image(user.uid, product_id, &new_path)
        .await
    {
        Ok(old_path) => {
            if let Some(old_path) = old_path {
                remove_stored_upload(&state.upload_config, &old_path).await;
            }
            Ok(Redirect::to("/inventory"))
        }
        Err(InventoryError::NotFound) => {
            // Unknown product: drop the file we just stored
            remove_stored_upload(&state.upload_config, &new_path).await;
            Ok(Redirect::to("/inventory"))
        }
        Err(e) => Err(AppError::from(e)),
    }
}

/// An accepted multipart file field, held in memory until stored
pub struct UploadedFile {
    pub data: axum::body::Bytes,
    pub extension: String,
}

struct ProductFormFields {
    name: String,
    price: f64,
    stock: i64,
    image: Option<UploadedFile>,
}

/// Read the add-product multipart form.
///
/// Returns None when a numeric field doesn't parse or the file is rejected
/// by type/size validation (the caller redirects back silently).
async fn read_product_form(
    mut multipart: Multipart,
    config: &UploadConfig,
) -> Result<Option<ProductFormFields>, AppError> {
    let mut name = String::new();
    let mut price: Option<f64> = None;
    let mut stock: Option<i64> = None;
    let mut image: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read multipart field: {}", e))?
    {
        match field.name() {
            Some("name") => {
                name = field
                    .text()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read name field: {}", e))?;
            }
            Some("price") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read price field: {}", e))?;
                price = text.trim().parse().ok();
            }
            Some("stock") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to read stock field: {}", e))?;
                stock = text.trim().parse().ok();
            }
            Some("image") => {
                image = read_image_field(field, config).await?;
            }
            _ => {}
        }
    }

    let (Some(price), Some(stock)) = (price, stock) else {
        return Ok(None);
    };

    Ok(Some(ProductFormFields {
        name,
        price,
        stock,
        image,
    }))
}

/// Read and validate one multipart file field.
///
/// Returns None for an empty field (no file picked), a disallowed MIME type
/// or an oversized file.
async fn read_image_field(
    field: axum::extract::multipart::Field<'_>,
    config: &UploadConfig,
) -> Result<Option<UploadedFile>, AppError> {
    let filename = field.file_name().unwrap_or("").to_string();
    if filename.is_empty() {
        return Ok(None);
    }

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    if !config.is_type_allowed(&content_type) {
        tracing::debug!("Rejected upload with disallowed type: {}", content_type);
        return Ok(None);
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read upload: {}", e))?;

    if data.len() as u64 > config.max_file_size {
        tracing::debug!(size = data.len(), "Rejected oversized upload");
        return Ok(None);
    }

    Ok(Some(UploadedFile {
        data,
        extension: file_extension(&filename, &content_type),
    }))
}

/// Write an accepted upload under the configured directory with a
/// randomized filename; returns the URL path to store on the product.
async fn store_upload(config: &UploadConfig, upload: &UploadedFile) -> Result<String, AppError> {
    if !config.path.exists() {
        tokio::fs::create_dir_all(&config.path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create upload dir: {}", e))?;
    }

    let filename = format!("{}.{}", Uuid::new_v4().simple(), upload.extension);
    let file_path = config.path.join(&filename);

    tokio::fs::write(&file_path, &upload.data)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save upload: {}", e))?;

    Ok(format!("/static/uploads/{}", filename))
}

/// Delete a previously stored upload, resolving only its basename under the
/// configured directory (stored paths are URLs, and traversal in a stale DB
/// value must not escape the uploads dir). Failures are logged and ignored.
async fn remove_stored_upload(config: &UploadConfig, url_path: &str) {
    let Some(basename) = std::path::Path::new(url_path)
        .file_name()
        .map(|n| n.to_os_string())
    else {
        return;
    };

    let file_path = config.path.join(basename);
    if let Err(e) = tokio::fs::remove_file(&file_path).await {
        tracing::debug!("Could not remove old upload {:?}: {}", file_path, e);
    }
}

/// Get file extension from the original filename, falling back to the
/// content type.
fn file_extension(filename: &str, content_type: &str) -> String {
    if let Some(ext) = filename.rsplit('.').next() {
        if !ext.is_empty() && ext != filename && ext.len() < 10 {
            return ext.to_lowercase();
        }
    }

    match content_type {
        "image/jpeg" => "jpg".to_string(),
        "image/png" => "png".to_string(),
        "image/gif" => "gif".to_string(),
        "image/webp" => "webp".to_string(),
        _ => "bin".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension_from_filename() {
        assert_eq!(file_extension("photo.JPG", "image/jpeg"), "jpg");
        assert_eq!(file_extension("a.b.webp", "image/webp"), "webp");
    }

    #[test]
    fn test_file_extension_falls_back_to_content_type() {
        assert_eq!(file_extension("noext", "image/png"), "png");
        assert_eq!(file_extension("", "image/gif"), "gif");
        assert_eq!(file_extension("noext", "application/octet-stream"), "bin");
    }

    #[tokio::test]
    async fn test_store_and_remove_upload() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = UploadConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };

        let upload = UploadedFile {
            data: axum::body::Bytes::from_static(b"fake image bytes"),
            extension: "png".to_string(),
        };

        let url = store_upload(&config, &upload).await.expect("store");
        assert!(url.starts_with("/static/uploads/"));
        assert!(url.ends_with(".png"));

        let stored: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .collect();
        assert_eq!(stored.len(), 1);

        remove_stored_upload(&config, &url).await;
        let remaining: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .collect();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_remove_upload_ignores_traversal() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = UploadConfig {
            path: dir.path().join("uploads"),
            ..Default::default()
        };
        tokio::fs::create_dir_all(&config.path).await.expect("mkdir");

        let outside = dir.path().join("secret.txt");
        tokio::fs::write(&outside, b"keep me").await.expect("write");

        remove_stored_upload(&config, "/static/uploads/../secret.txt").await;

        // Only the basename is resolved, so the file outside survives
        assert!(outside.exists());
    }
}
