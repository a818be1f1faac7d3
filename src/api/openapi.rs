//! OpenAPI document assembled from the handler annotations.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::{events, genres, system, users};

/// The service's OpenAPI description.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "crowdsync",
        description = "DJ events, QR guest registration and live genre statistics."
    ),
    paths(
        system::health_handler,
        events::list_events,
        events::create_event,
        events::live_events,
        events::history_events,
        events::my_events,
        events::events_by_owner,
        events::get_event,
        events::update_event,
        events::delete_event,
        events::event_dj,
        events::event_qr_code,
        events::genre_update,
        events::genre_select,
        events::assign_user,
        events::validate_serial,
        genres::genre_stats,
        users::register,
        users::login,
        users::logout,
        users::check_auth,
        users::check_admin,
        users::current_user,
        users::update_profile,
        users::update_genre,
        users::scan_qr,
        users::user_stats,
        users::download_user_details,
        users::dj_info,
        users::list_djs,
        users::generate_qr,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Events", description = "Event lifecycle, views and registration"),
        (name = "Genres", description = "Genre selection and live counters"),
        (name = "Users", description = "Accounts, profile and DJ reporting"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT scheme referenced by secured paths.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
