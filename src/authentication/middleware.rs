use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use crate::database::error::Error;

use super::jwt::{verify_jwt_session, JwtSessionData};

pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        if verify_jwt_session(session).is_ok() {
            Ok(())
        } else {
            Err(Rejection::from(Error::InvalidSession))
        }
    })
}

pub fn with_session() -> impl Filter<Extract = (JwtSessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        verify_jwt_session(session).map_err(Rejection::from)
    })
}

/// Optional session for read endpoints: anonymous readers get `None`, which
/// downstream turns into `is_favorited`/`is_in_shopping_cart` being false.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<JwtSessionData>,), Error = Infallible> + Copy {
    warp::filters::cookie::optional::<String>("session").map(|session: Option<String>| {
        session.and_then(|session| verify_jwt_session(session).ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn possible_session_never_rejects() {
        let filter = with_possible_session();

        let anonymous = warp::test::request().filter(&filter).await.unwrap();
        assert!(anonymous.is_none());

        let garbage = warp::test::request()
            .header("cookie", "session=not-a-token")
            .filter(&filter)
            .await
            .unwrap();
        assert!(garbage.is_none());
    }

    #[tokio::test]
    async fn missing_session_rejects_authenticated_filters() {
        assert!(warp::test::request().filter(&with_session()).await.is_err());
        assert!(warp::test::request().filter(&with_auth()).await.is_err());
    }
}
