use oficina_storage::WorkshopStorage;
use serde::Serialize;

use super::{require_order, ActionError, RegisterPhotoInput};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredPhoto {
    #[serde(rename = "ordem_servico_id")]
    pub order_id: String,
    #[serde(rename = "numero_os")]
    pub number: i64,
    #[serde(rename = "total_fotos")]
    pub photo_count: usize,
}

// Read-modify-write: concurrent calls on one order may drop a photo.
pub(super) async fn run(
    storage: &dyn WorkshopStorage,
    input: &RegisterPhotoInput,
) -> Result<RegisteredPhoto, ActionError> {
    let order = require_order(storage, input.number).await?;

    let mut photos = order.photo_urls;
    photos.push(input.photo_url.clone());
    let photo_count = photos.len();

    storage.update_order_photos(&order.id, photos).await?;

    Ok(RegisteredPhoto {
        order_id: order.id,
        number: input.number,
        photo_count,
    })
}
