use actix_web::{web, Either, HttpRequest, HttpResponse};

use crate::{
    entities::contact::ContactForm,
    errors::AppError,
    utils::get_client_ip::get_client_ip,
    AppState,
};

/// Accepts the contact form as JSON or as a classic url-encoded form post.
pub async fn submit_contact(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Either<web::Json<ContactForm>, web::Form<ContactForm>>,
) -> Result<HttpResponse, AppError> {
    let form = match payload {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };

    let client_key = get_client_ip(&req, state.trust_x_forwarded_for);

    let response = state.contact_handler
        .submit(&client_key, form)
        .await?;

    Ok(HttpResponse::Ok().json(response))
}
