//! Runtime shim injected into every rewritten HTML document.
//!
//! The server-side passes only catch literals; this script patches the
//! URL-constructing browser APIs so requests built at runtime are routed
//! through the proxy too. The proxy prefix and resolution base are baked
//! in as closures at injection time.

/// Marker attribute so the shim can be identified in emitted documents.
pub const SHIM_MARKER: &str = "data-proxy-shim";

const SHIM_TEMPLATE: &str = r#"<script data-proxy-shim>
(function() {
  var proxyPath = '__PROXY_PREFIX__';
  var baseUrl = '__PROXY_BASE__';

  function reroute(url) {
    if (typeof url !== 'string' || url.indexOf(proxyPath + '/') === 0) {
      return url;
    }
    if (url.indexOf('http://') === 0 || url.indexOf('https://') === 0) {
      return proxyPath + '/' + encodeURIComponent(url);
    }
    if (url.indexOf('/') === 0) {
      try {
        return proxyPath + '/' + encodeURIComponent(new URL(url, baseUrl).href);
      } catch (e) {}
    }
    return url;
  }

  var originalFetch = window.fetch;
  window.fetch = function(url, options) {
    if (typeof url === 'string') {
      arguments[0] = reroute(url);
    }
    return originalFetch.apply(this, arguments);
  };

  var originalOpen = XMLHttpRequest.prototype.open;
  XMLHttpRequest.prototype.open = function(method, url) {
    var args = Array.prototype.slice.call(arguments);
    if (typeof url === 'string') {
      args[1] = reroute(url);
    }
    return originalOpen.apply(this, args);
  };

  var OriginalWebSocket = window.WebSocket;
  window.WebSocket = function(url, protocols) {
    if (typeof url === 'string' && (url.indexOf('ws://') === 0 || url.indexOf('wss://') === 0)) {
      url = reroute(url.replace(/^wss/, 'https').replace(/^ws/, 'http'));
    }
    return protocols === undefined ? new OriginalWebSocket(url) : new OriginalWebSocket(url, protocols);
  };

  var originalCreateElement = document.createElement;
  document.createElement = function(tagName, options) {
    var element = originalCreateElement.call(this, tagName, options);
    var tag = String(tagName).toLowerCase();
    if (tag === 'script' || tag === 'link' || tag === 'img' || tag === 'iframe') {
      var originalSetAttribute = element.setAttribute;
      element.setAttribute = function(name, value) {
        if ((name === 'src' || name === 'href') && typeof value === 'string') {
          value = reroute(value);
        }
        return originalSetAttribute.call(this, name, value);
      };
    }
    return element;
  };
})();
</script>"#;

/// Render the shim for one request's prefix and resolution base.
pub fn shim_script(prefix: &str, base_url: &str) -> String {
    SHIM_TEMPLATE
        .replace("__PROXY_PREFIX__", prefix)
        .replace("__PROXY_BASE__", base_url)
}
