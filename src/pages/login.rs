use html_escape::{encode_double_quoted_attribute, encode_text};

use super::layout;
use crate::policy::{MOCK_PASSWORD, MOCK_USERNAME, MSG_ACCOUNT_LOCKED, MSG_LOADING};
use crate::view::LoginView;

/// 渲染登录页。表单在锁定时整体禁用，提交中时按钮显示加载状态。
pub fn render_login(view: &LoginView) -> String {
    let locked = view.is_locked();
    let disabled = if locked { " disabled" } else { "" };
    let button_disabled = if locked || view.is_loading() {
        " disabled"
    } else {
        ""
    };

    let error = view
        .error()
        .map(|message| {
            format!(
                r#"<div class="alert alert-error" role="alert" data-cy="error-message">{}</div>"#,
                encode_text(message)
            )
        })
        .unwrap_or_default();

    let lockout = if locked {
        format!(
            r#"<div class="alert alert-warning" role="status" data-cy="lockout-message" id="lockout-message">{}. Tempo restante: {}</div>"#,
            MSG_ACCOUNT_LOCKED,
            view.remaining_display()
        )
    } else {
        String::new()
    };

    let button_label = if view.is_loading() {
        format!(r#"<span class="spinner"></span>{}"#, MSG_LOADING)
    } else {
        "Entrar".to_string()
    };

    let body = format!(
        r#"<main class="page page-center">
<section class="card card-login">
<header class="card-header">
<div class="icon-badge">&#128274;</div>
<h1>Login</h1>
<p class="muted">Entre com suas credenciais</p>
</header>
{error}
{lockout}
<form method="post" action="/" id="login-form" data-locked="{locked}" data-remaining="{remaining}">
<div class="field">
<label for="username">Nome de usuário</label>
<input id="username" name="username" type="text" placeholder="Digite seu nome de usuário" value="{username}" data-cy="username-input" required{disabled}>
</div>
<div class="field">
<label for="password">Senha</label>
<input id="password" name="password" type="password" placeholder="Digite sua senha" data-cy="password-input" required{disabled}>
</div>
<button type="submit" class="btn btn-primary" data-cy="login-button"{button_disabled}>{button_label}</button>
</form>
<footer class="hint">
<p>Usuário de teste: {mock_username}</p>
<p>Senha de teste: {mock_password}</p>
</footer>
</section>
</main>"#,
        error = error,
        lockout = lockout,
        locked = locked,
        remaining = view.remaining_secs(),
        username = encode_double_quoted_attribute(view.username()),
        disabled = disabled,
        button_disabled = button_disabled,
        button_label = button_label,
        mock_username = MOCK_USERNAME,
        mock_password = MOCK_PASSWORD,
    );

    layout("Login", &body, Some("/static/login.js"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::policy::LockoutPolicy;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn view() -> LoginView {
        LoginView::mount(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(0)),
            LockoutPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn idle_form_is_enabled_and_required() {
        let html = render_login(&view());
        assert!(html.contains(r#"data-cy="username-input" required>"#));
        assert!(html.contains(r#"data-cy="password-input" required>"#));
        assert!(html.contains(r#"data-cy="login-button">Entrar</button>"#));
        assert!(!html.contains("Conta bloqueada"));
        assert!(!html.contains("data-cy=\"error-message\""));
    }

    #[test]
    fn loading_form_shows_the_indicator() {
        let mut view = view();
        view.begin_submit().unwrap();
        let html = render_login(&view);
        assert!(html.contains("Entrando..."));
        assert!(html.contains(r#"data-cy="login-button" disabled>"#));
    }

    #[test]
    fn locked_form_disables_every_control() {
        let mut view = view();
        for _ in 0..3 {
            view.begin_submit().unwrap();
            view.complete_submit("admin", "bad").unwrap();
        }
        let html = render_login(&view);
        assert!(html.contains("Conta bloqueada. Tempo restante: 15:00"));
        assert!(html.contains("Muitas tentativas de login. Tente novamente em 15 minutos."));
        assert!(html.contains(r#"data-cy="username-input" required disabled>"#));
        assert!(html.contains(r#"data-cy="password-input" required disabled>"#));
        assert!(html.contains(r#"data-cy="login-button" disabled>"#));
        assert!(html.contains(r#"data-locked="true""#));
    }

    #[test]
    fn echoed_username_is_escaped() {
        let mut view = view();
        view.begin_submit().unwrap();
        view.complete_submit(r#""><script>alert(1)</script>"#, "bad")
            .unwrap();
        let html = render_login(&view);
        assert!(!html.contains(r#"value=""><script>"#));
        assert!(html.contains("value=\"&quot;"));
    }
}
