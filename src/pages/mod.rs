mod dashboard;
mod login;

pub use dashboard::render_dashboard;
pub use login::render_login;

fn layout(title: &str, body: &str, script: Option<&str>) -> String {
    let script = script
        .map(|src| format!(r#"<script src="{}" defer></script>"#, src))
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/app.css">
</head>
<body>
<div class="bg-pattern"></div>
{body}
{script}
</body>
</html>
"#,
        title = html_escape::encode_text(title),
        body = body,
        script = script,
    )
}
