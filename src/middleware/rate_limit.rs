use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Fixed one-second window counter shared by every request on a router.
#[derive(Clone, Debug)]
pub struct RpsLimit {
    max_per_second: u32,
    window: Arc<Mutex<Window>>,
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    served: u32,
}

impl RpsLimit {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second: max_per_second.max(1),
            window: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                served: 0,
            })),
        }
    }

    fn try_acquire(&self) -> bool {
        let mut window = self.window.lock().expect("rps window mutex poisoned");
        if window.opened.elapsed() >= Duration::from_secs(1) {
            window.opened = Instant::now();
            window.served = 0;
        }
        if window.served < self.max_per_second {
            window.served += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limit): State<RpsLimit>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limit.try_acquire() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_up_to_the_limit_then_rejects() {
        let limit = RpsLimit::new(3);
        assert!(limit.try_acquire());
        assert!(limit.try_acquire());
        assert!(limit.try_acquire());
        assert!(!limit.try_acquire());
    }

    #[test]
    fn zero_is_clamped_to_one() {
        let limit = RpsLimit::new(0);
        assert!(limit.try_acquire());
        assert!(!limit.try_acquire());
    }
}
