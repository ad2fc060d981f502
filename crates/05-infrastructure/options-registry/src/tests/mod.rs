//! 注册中心跨模块测试
