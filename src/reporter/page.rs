//! Standalone HTML page around a rendered report.
//!
//! Listeners bound in the document do not survive serialization, so the page
//! carries a small script that re-binds the same interactions.

use crate::dom::{Document, escape};

/// Serialize the document body into a self-contained page.
pub fn render_page(doc: &Document, title: &str) -> String {
    let mut html = String::with_capacity(16_384);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>");
    html.push_str(&escape(title));
    html.push_str("</title>\n");
    html.push_str(template_style());
    html.push_str("</head>\n<body>\n");
    html.push_str(&doc.inner_html(doc.body()));
    html.push('\n');
    html.push_str(template_script());
    html.push_str("</body>\n</html>\n");
    html
}

fn template_style() -> &'static str {
    r#"<style>
body{font:14px/1.5 "Helvetica Neue",Helvetica,Arial,sans-serif;margin:0;padding:60px 50px;color:#222}
#hydro ul{list-style:none;margin:0;padding:0}
#hydro h1{margin-top:15px;font-size:1em;font-weight:200}
#hydro h1 a{text-decoration:none;color:inherit}
#hydro h1 a:hover{text-decoration:underline}
#hydro .suite .suite h1{margin-top:0}
#hydro .test{margin-left:15px;overflow:hidden}
#hydro .test h2{font-size:12px;font-weight:normal;margin:0;cursor:pointer}
#hydro .test.pass h2::before{content:"\2713";display:inline-block;margin-right:5px;color:#00d6b2}
#hydro .test.pass.pending h2{color:#0b97c4}
#hydro .test.pass.pending h2::before{content:"\25E6";color:#0b97c4}
#hydro .test.fail h2,#hydro .test pre.error{color:#c00}
#hydro .test.fail h2::before{content:"\2716";margin-right:5px;color:#c00}
#hydro .test .duration{margin-left:5px;padding:2px 5px;font-size:9px;color:#fff;background:#c09853;border-radius:4px}
#hydro .test.fast .duration{display:none}
#hydro .test.medium .duration{background:#c09853}
#hydro .test.slow .duration{background:#b94a48}
#hydro .test pre{display:block;float:left;clear:left;font:12px/1.5 monaco,monospace;margin:5px;padding:15px;border:1px solid #eee;max-width:85%;white-space:pre-wrap;word-wrap:break-word;border-radius:3px}
#hydro .test code .comment{color:#ddd}
#hydro .test code .init{color:#2f6fad}
#hydro .test code .string{color:#5890ad}
#hydro .test code .keyword{color:#8a6343}
#hydro .test code .number{color:#2f6fad}
#hydro-report.pass .test.fail,#hydro-report.fail .test.pass{display:none}
#hydro .suite.hidden{display:none}
#hydro-stats{position:fixed;top:15px;right:10px;margin:0;font-size:12px;color:#888;z-index:1}
#hydro-stats li{display:inline-block;margin:0 5px;list-style:none;padding-top:11px}
#hydro-stats em{color:#000}
#hydro-stats a{text-decoration:none;color:inherit}
#hydro-stats a:hover{border-bottom:1px solid #eee}
#hydro-stats progress{width:60px;margin-right:5px;vertical-align:middle}
</style>
"#
}

fn template_script() -> &'static str {
    r#"<script>
(()=>{
const $=(s,r=document)=>r.querySelector(s);
const $$=(s,r=document)=>[...r.querySelectorAll(s)];
const report=$('#hydro-report');
if(!report)return;
const toggle=(marker,cls)=>{
  const active=report.classList.contains(marker);
  $$('.suite.hidden',report).forEach(s=>s.classList.remove('hidden'));
  report.classList.remove('pass','fail');
  if(active)return;
  report.classList.add(marker);
  $$('.suite',report).forEach(s=>{if(!$(cls,s))s.classList.add('hidden')});
};
const link=(item,marker,cls)=>{
  const a=$('#hydro-stats .'+item+' a');
  if(a)a.addEventListener('click',e=>{e.preventDefault();toggle(marker,cls)});
};
link('passes','pass','.test.pass');
link('failures','fail','.test.fail');
$$('.test h2',report).forEach(h=>{
  const pre=[...h.parentNode.children].find(c=>c.tagName==='PRE'&&!c.classList.contains('error'));
  if(pre)h.addEventListener('click',()=>{pre.style.display=pre.style.display==='none'?'block':'none'});
  const focus=h.getAttribute('data-focus');
  if(focus)h.addEventListener('dblclick',()=>{window.location.search=focus});
});
})();
</script>
"#
}
